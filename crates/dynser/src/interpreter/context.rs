//! State carried through one conversion.

use crate::types::{Fields, Properties, PropertyValue, string_fields};

/// Shared state visible to every script during a top-level conversion.
///
/// Scripts see it as the `CONTEXT` map and may change it; changes are kept
/// for the rest of the conversion, including nested tag conversions, and
/// across conversions made with the same converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: Properties,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_properties(values: Properties) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.values.remove(key)
    }

    pub fn properties(&self) -> &Properties {
        &self.values
    }

    /// String-valued entries, used to select dynamic patterns.
    pub fn fields(&self) -> Fields {
        string_fields(&self.values)
    }

    /// Replace the whole context with what a script left behind.
    pub fn replace(&mut self, values: Properties) {
        self.values = values;
    }
}

/// Tracks nested tag conversions to bound recursion.
#[derive(Debug, Clone)]
pub(crate) struct CallStack {
    tags: Vec<String>,
    max_depth: usize,
}

impl CallStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            tags: Vec::new(),
            max_depth,
        }
    }

    /// Enter a tag conversion, failing with the depth limit when it is reached.
    pub(crate) fn push(&mut self, tag: &str) -> Result<(), usize> {
        if self.tags.len() >= self.max_depth {
            return Err(self.max_depth);
        }
        self.tags.push(tag.to_string());
        Ok(())
    }

    pub(crate) fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub(crate) fn pop(&mut self) {
        self.tags.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn call_stack_stops_at_max_depth() {
        let mut calls = CallStack::new(2);
        assert_eq!(calls.push("a"), Ok(()));
        assert_eq!(calls.push("a"), Ok(()));
        assert_eq!(calls.push("a"), Err(2));
        calls.pop();
        assert_eq!(calls.depth(), 1);
    }

    #[test]
    fn fields_skip_non_string_values() {
        let context = Context::from_properties(props! { "a" => "1", "b" => vec!["2"] });
        assert_eq!(context.fields().len(), 1);
    }
}
