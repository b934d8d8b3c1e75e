//! Scripting collaborator.
//!
//! Tags carry optional scripts that map properties to template fields and
//! back, and branched trees carry a script that picks a branch. The
//! [`ScriptHost`] trait is the calling convention; [`RhaiScriptHost`] runs the
//! scripts with rhai.

use rhai::{Array, Dynamic, Engine, Map, Scope};
use thiserror::Error;
use tracing::trace;

use crate::interpreter::Context;
use crate::types::{Fields, Properties, PropertyValue};

/// Variable names bound for every script.
pub mod keywords {
    /// Shared conversion state, read-write.
    pub const CONTEXT: &str = "CONTEXT";
    /// The properties (or fields) being converted.
    pub const INPUT_TABLE: &str = "INPUT_TABLE";
    /// Starts empty; read back after the script ran.
    pub const OUTPUT_TABLE: &str = "OUTPUT_TABLE";
    /// Branch index chosen by a branching script.
    pub const BRANCH: &str = "BRANCH";
    /// Value of `BRANCH` before the branching script runs.
    pub const BRANCH_NOT_SET: i64 = -1;
}

/// A script that did not complete. The message is the engine's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptFailure {
    pub message: String,
}

impl ScriptFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs tag scripts.
///
/// Every invocation sees `CONTEXT`, `INPUT_TABLE` and `OUTPUT_TABLE`. The
/// context is written back only when the script succeeds.
pub trait ScriptHost {
    /// Run a serialization script and read `OUTPUT_TABLE` as fields.
    fn to_fields(
        &self,
        script: &str,
        context: &mut Context,
        input: &Properties,
    ) -> Result<Fields, ScriptFailure>;

    /// Run a branching script and read `BRANCH`.
    ///
    /// Returns `None` when the script left `BRANCH` at its unset value.
    fn select_branch(
        &self,
        script: &str,
        context: &mut Context,
        input: &Properties,
    ) -> Result<Option<i64>, ScriptFailure>;

    /// Run a deserialization script and read `OUTPUT_TABLE` as properties.
    fn to_properties(
        &self,
        script: &str,
        context: &mut Context,
        fields: &Fields,
    ) -> Result<Properties, ScriptFailure>;
}

/// [`ScriptHost`] backed by the rhai engine.
///
/// # Example
///
/// ```
/// use dynser::{props, Context, RhaiScriptHost, ScriptHost};
///
/// let host = RhaiScriptHost::new();
/// let mut context = Context::new();
/// let fields = host
///     .to_fields(
///         "OUTPUT_TABLE.sum = parse_int(INPUT_TABLE.a) + 1;",
///         &mut context,
///         &props! { "a" => "41" },
///     )
///     .unwrap();
/// assert_eq!(fields["sum"], "42");
/// ```
pub struct RhaiScriptHost {
    engine: Engine,
}

impl Default for RhaiScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiScriptHost {
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Use a preconfigured engine, for example one with registered functions.
    pub fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }

    /// Run `script` in a fresh scope holding the standard bindings.
    ///
    /// `extra` adds bindings before the run. On success the context is
    /// updated and the scope is returned for reading outputs.
    fn run(
        &self,
        script: &str,
        context: &mut Context,
        input: Dynamic,
        extra: &[(&str, Dynamic)],
    ) -> Result<Scope<'static>, ScriptFailure> {
        trace!(script, "running script");
        let mut scope = Scope::new();
        scope.push_dynamic(keywords::CONTEXT, properties_to_dynamic(context.properties()));
        scope.push_dynamic(keywords::INPUT_TABLE, input);
        scope.push_dynamic(keywords::OUTPUT_TABLE, Dynamic::from_map(Map::new()));
        for (name, value) in extra {
            scope.push_dynamic(*name, value.clone());
        }

        self.engine
            .run_with_scope(&mut scope, script)
            .map_err(|e| ScriptFailure::new(e.to_string()))?;

        if let Some(updated) = scope.get_value::<Dynamic>(keywords::CONTEXT) {
            context.replace(dynamic_to_properties(updated, keywords::CONTEXT)?);
        }
        Ok(scope)
    }
}

impl ScriptHost for RhaiScriptHost {
    fn to_fields(
        &self,
        script: &str,
        context: &mut Context,
        input: &Properties,
    ) -> Result<Fields, ScriptFailure> {
        let scope = self.run(script, context, properties_to_dynamic(input), &[])?;
        let output = read_output(&scope)?;
        Ok(output
            .into_iter()
            .filter(|(_, value)| !value.is_unit())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect())
    }

    fn select_branch(
        &self,
        script: &str,
        context: &mut Context,
        input: &Properties,
    ) -> Result<Option<i64>, ScriptFailure> {
        let scope = self.run(
            script,
            context,
            properties_to_dynamic(input),
            &[(keywords::BRANCH, Dynamic::from(keywords::BRANCH_NOT_SET))],
        )?;
        let branch = scope
            .get_value::<Dynamic>(keywords::BRANCH)
            .ok_or_else(|| ScriptFailure::new(format!("{} was removed", keywords::BRANCH)))?;
        let selected = branch.as_int().map_err(|type_name| {
            ScriptFailure::new(format!(
                "{} must be an integer, found {type_name}",
                keywords::BRANCH
            ))
        })?;
        Ok((selected != keywords::BRANCH_NOT_SET).then_some(selected))
    }

    fn to_properties(
        &self,
        script: &str,
        context: &mut Context,
        fields: &Fields,
    ) -> Result<Properties, ScriptFailure> {
        let input: Map = fields
            .iter()
            .map(|(key, value)| (key.as_str().into(), Dynamic::from(value.clone())))
            .collect();
        let scope = self.run(script, context, Dynamic::from_map(input), &[])?;
        let output = read_output(&scope)?;
        Ok(dynamic_map_to_properties(output))
    }
}

fn read_output(scope: &Scope<'_>) -> Result<Map, ScriptFailure> {
    let output = scope
        .get_value::<Dynamic>(keywords::OUTPUT_TABLE)
        .ok_or_else(|| ScriptFailure::new(format!("{} was removed", keywords::OUTPUT_TABLE)))?;
    let type_name = output.type_name();
    output.try_cast::<Map>().ok_or_else(|| {
        ScriptFailure::new(format!(
            "{} must be a map, found {type_name}",
            keywords::OUTPUT_TABLE
        ))
    })
}

fn properties_to_dynamic(props: &Properties) -> Dynamic {
    let map: Map = props
        .iter()
        .map(|(key, value)| (key.as_str().into(), value_to_dynamic(value)))
        .collect();
    Dynamic::from_map(map)
}

fn value_to_dynamic(value: &PropertyValue) -> Dynamic {
    match value {
        PropertyValue::String(s) => Dynamic::from(s.clone()),
        PropertyValue::List(items) => {
            Dynamic::from_array(items.iter().map(value_to_dynamic).collect())
        }
        PropertyValue::Map(map) => properties_to_dynamic(map),
    }
}

fn dynamic_to_properties(value: Dynamic, name: &str) -> Result<Properties, ScriptFailure> {
    let type_name = value.type_name();
    let map = value
        .try_cast::<Map>()
        .ok_or_else(|| ScriptFailure::new(format!("{name} must be a map, found {type_name}")))?;
    Ok(dynamic_map_to_properties(map))
}

/// Unit entries are dropped: they are what rhai yields for missing keys.
fn dynamic_map_to_properties(map: Map) -> Properties {
    map.into_iter()
        .filter_map(|(key, value)| dynamic_to_value(value).map(|value| (key.to_string(), value)))
        .collect()
}

fn dynamic_to_value(value: Dynamic) -> Option<PropertyValue> {
    if value.is_unit() {
        return None;
    }
    if value.is_array() {
        let items = value.try_cast::<Array>()?;
        return Some(PropertyValue::List(
            items.into_iter().filter_map(dynamic_to_value).collect(),
        ));
    }
    if value.is_map() {
        let map = value.try_cast::<Map>()?;
        return Some(PropertyValue::Map(dynamic_map_to_properties(map)));
    }
    Some(PropertyValue::String(value.to_string()))
}
