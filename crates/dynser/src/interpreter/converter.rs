//! The top-level conversion object.

use std::path::Path;

use bon::Builder;
use tracing::debug;

use crate::config::{Config, LoadError};
use crate::interpreter::deserialize::Deserializer;
use crate::interpreter::error::{
    DeserializeError, DeserializeErrorKind, SerializeError, SerializeErrorKind,
};
use crate::interpreter::mapper::Mapper;
use crate::interpreter::script::{RhaiScriptHost, ScriptHost};
use crate::interpreter::serialize::Serializer;
use crate::interpreter::Context;
use crate::types::Properties;

/// Converts properties to strings and back according to a loaded schema.
///
/// The converter owns the schema, the script host and the shared context.
/// Conversions take `&mut self`: scripts may update the context, and the
/// updates are visible to later conversions.
///
/// # Example
///
/// ```
/// use dynser::{props, Converter};
///
/// let mut converter = Converter::new();
/// converter
///     .load_config_str(
///         r#"
/// tags:
///   point:
///     continual:
///       - linear: { pattern: "{x}", fields: { 1: x } }
///       - linear: { pattern: ",{y}", fields: { 1: y } }
/// "#,
///     )
///     .unwrap();
///
/// let text = converter.convert("point", &props! { "x" => "3", "y" => "4" }).unwrap();
/// assert_eq!(text, "3,4");
/// assert_eq!(converter.convert_back("point", &text).unwrap(), props! { "x" => "3", "y" => "4" });
/// ```
#[derive(Builder)]
pub struct Converter {
    config: Option<Config>,

    #[builder(default = default_scripts())]
    scripts: Box<dyn ScriptHost>,

    /// Maximum nesting of tag references (default 64).
    #[builder(default = 64)]
    max_depth: usize,

    #[builder(default)]
    context: Context,
}

fn default_scripts() -> Box<dyn ScriptHost> {
    Box::new(RhaiScriptHost::new())
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// A converter with no schema, the rhai script host and an empty context.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Replace the schema.
    pub fn set_config(&mut self, config: Config) {
        self.config = Some(config);
    }

    /// Replace the schema with one parsed from YAML text.
    pub fn load_config_str(&mut self, text: &str) -> Result<(), LoadError> {
        self.set_config(Config::from_yaml_str(text)?);
        Ok(())
    }

    /// Replace the schema with one read from a YAML file.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.set_config(Config::from_file(path)?);
        Ok(())
    }

    /// Add the tags of a YAML schema to the current one.
    pub fn merge_config_str(&mut self, text: &str) -> Result<(), LoadError> {
        self.merge(Config::from_yaml_str(text)?);
        Ok(())
    }

    /// Add the tags of a YAML schema file to the current one.
    pub fn merge_config(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.merge(Config::from_file(path)?);
        Ok(())
    }

    fn merge(&mut self, other: Config) {
        match &mut self.config {
            Some(config) => config.merge(other),
            None => self.config = Some(other),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Convert `props` to a string with the tag named `tag`.
    pub fn convert(&mut self, tag: &str, props: &Properties) -> Result<String, SerializeError> {
        let Some(config) = &self.config else {
            return Err(SerializeError::new(
                SerializeErrorKind::ConfigNotLoaded,
                props.clone(),
            ));
        };
        debug!(tag, "convert");
        Serializer::new(config, self.scripts.as_ref(), &mut self.context, self.max_depth)
            .convert(tag, props)
    }

    /// Recover properties from a string produced by the tag named `tag`.
    pub fn convert_back(&mut self, tag: &str, text: &str) -> Result<Properties, DeserializeError> {
        let Some(config) = &self.config else {
            return Err(DeserializeError::new(
                DeserializeErrorKind::ConfigNotLoaded,
                text,
            ));
        };
        debug!(tag, "convert back");
        Deserializer::new(config, self.scripts.as_ref(), &mut self.context, self.max_depth)
            .convert_back(tag, text)
    }

    /// Convert an application value through `mapper`.
    pub fn serialize<T>(
        &mut self,
        tag: &str,
        mapper: &impl Mapper<T>,
        target: &T,
    ) -> Result<String, SerializeError> {
        let props = mapper.to_properties(&mut self.context, target);
        self.convert(tag, &props)
    }

    /// Recover an application value through `mapper`.
    pub fn deserialize<T>(
        &mut self,
        tag: &str,
        mapper: &impl Mapper<T>,
        text: &str,
    ) -> Result<T, DeserializeError> {
        let props = self.convert_back(tag, text)?;
        Ok(mapper.from_properties(&mut self.context, props))
    }
}
