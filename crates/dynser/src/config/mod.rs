//! Schema model: tags, their rule trees, loading and validation.
//!
//! A [`Config`] maps tag names to [`Tag`]s. Schemas are written in YAML and
//! can be merged, so a project can split its tags over several files.

mod load;
mod rules;
mod validate;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bon::Builder;

pub use load::LoadError;
pub use rules::{
    Branched, Existing, Leaf, Linear, Priority, RecurrentDict, RecurrentRule, Rule, RuleTree,
};
pub use validate::ConfigIssue;

/// A named schema entry.
///
/// # Example
///
/// ```
/// use dynser::config::{Linear, Rule, RuleTree, Tag};
///
/// let tag = Tag::builder()
///     .rules(RuleTree::Continual(vec![Rule::Linear(
///         Linear::builder().pattern("hello").build(),
///     )]))
///     .serialization_script("OUTPUT_TABLE.x = INPUT_TABLE.x;")
///     .build();
/// assert!(tag.deserialization_script.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Tag {
    pub rules: RuleTree,

    /// Maps input properties to template fields. Identity when absent.
    #[builder(into)]
    pub serialization_script: Option<String>,

    /// Maps matched fields back to properties. Identity when absent.
    #[builder(into)]
    pub deserialization_script: Option<String>,
}

/// A set of tags addressed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub tags: BTreeMap<String, Tag>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML schema.
    pub fn from_yaml_str(text: &str) -> Result<Self, LoadError> {
        load::parse_yaml(text, None)
    }

    /// Read and parse a YAML schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        load::parse_yaml(&text, Some(path))
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Insert a tag, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) -> Option<Tag> {
        self.tags.insert(name.into(), tag)
    }

    /// Add every tag of `other`, replacing same-named tags.
    pub fn merge(&mut self, other: Config) {
        self.tags.extend(other.tags);
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check the schema without evaluating anything.
    ///
    /// Reports unparseable patterns, references to unknown tags and field
    /// maps that name groups their pattern does not define.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        validate::validate(self)
    }
}
