//! Properties to string conversion.
//!
//! The serializer walks a tag's rule tree, recursing into referenced tags.
//! Failures carry one breadcrumb per enclosing tag frame.

use tracing::{debug, trace};

use crate::config::{
    Branched, Config, Existing, Leaf, Linear, RecurrentDict, RecurrentRule, Rule, RuleTree, Tag,
};
use crate::interpreter::compose::compose;
use crate::interpreter::context::{CallStack, Context};
use crate::interpreter::error::{SerializeError, SerializeErrorKind, compute_suggestions};
use crate::interpreter::repetition::max_repetition;
use crate::interpreter::resolve::{GroupValues, resolve, resolve_dynamic};
use crate::interpreter::script::ScriptHost;
use crate::types::{
    Fields, ListSlices, Properties, PropertyValue, overlay, split_lists, string_fields,
};

/// State of one top-level `convert` call.
pub(crate) struct Serializer<'a> {
    config: &'a Config,
    scripts: &'a dyn ScriptHost,
    context: &'a mut Context,
    calls: CallStack,
}

impl<'a> Serializer<'a> {
    pub(crate) fn new(
        config: &'a Config,
        scripts: &'a dyn ScriptHost,
        context: &'a mut Context,
        max_depth: usize,
    ) -> Self {
        Self {
            config,
            scripts,
            context,
            calls: CallStack::new(max_depth),
        }
    }

    /// Convert `props` with the tag named `tag_name`.
    pub(crate) fn convert(
        &mut self,
        tag_name: &str,
        props: &Properties,
    ) -> Result<String, SerializeError> {
        let config = self.config;
        let Some(tag) = config.get(tag_name) else {
            return Err(SerializeError::new(
                SerializeErrorKind::TagNotFound {
                    tag: tag_name.to_string(),
                    suggestions: compute_suggestions(tag_name, config.tag_names()),
                },
                props.clone(),
            ));
        };

        self.calls.push(tag_name).map_err(|depth| {
            SerializeError::new(SerializeErrorKind::MaxDepthExceeded { depth }, props.clone())
        })?;
        let result = self.convert_tag(tag_name, tag, props);
        self.calls.pop();
        result
    }

    fn convert_tag(
        &mut self,
        name: &str,
        tag: &'a Tag,
        props: &Properties,
    ) -> Result<String, SerializeError> {
        debug!(tag = name, depth = self.calls.depth(), "converting tag");
        let split = split_lists(props);
        let fields = if split.residual.is_empty() {
            Fields::new()
        } else {
            self.fields(tag, &split.residual, props)?
        };

        match &tag.rules {
            RuleTree::Continual(rules) => self.continual(name, rules, props, &fields),
            RuleTree::Branched(branched) => self.branched(name, branched, props, &fields),
            RuleTree::Recurrent(rules) => self.recurrent(name, tag, rules, props, &split, &fields),
            RuleTree::RecurrentDict(dict) => self.recurrent_dict(name, dict, props),
        }
    }

    /// Run the tag's serialization script, or take the string properties as
    /// they are when the tag has none.
    fn fields(
        &mut self,
        tag: &Tag,
        input: &Properties,
        scope: &Properties,
    ) -> Result<Fields, SerializeError> {
        match &tag.serialization_script {
            Some(script) => self
                .scripts
                .to_fields(script, self.context, input)
                .map_err(|e| {
                    SerializeError::new(
                        SerializeErrorKind::ScriptError { message: e.message },
                        scope.clone(),
                    )
                }),
            None => Ok(string_fields(input)),
        }
    }

    fn continual(
        &mut self,
        name: &str,
        rules: &'a [Rule],
        props: &Properties,
        fields: &Fields,
    ) -> Result<String, SerializeError> {
        let mut result = String::new();
        for (index, rule) in rules.iter().enumerate() {
            let text = self
                .leaf(rule.leaf(), props, fields)
                .map_err(|e| e.within(name, index))?;
            result.push_str(&text);
        }
        Ok(result)
    }

    fn branched(
        &mut self,
        name: &str,
        branched: &'a Branched,
        props: &Properties,
        fields: &Fields,
    ) -> Result<String, SerializeError> {
        let selected = self
            .scripts
            .select_branch(&branched.script, self.context, props)
            .map_err(|e| {
                SerializeError::new(
                    SerializeErrorKind::ScriptError { message: e.message },
                    props.clone(),
                )
            })?;
        let Some(selected) = selected else {
            return Err(SerializeError::new(
                SerializeErrorKind::BranchNotSet,
                props.clone(),
            ));
        };

        let index = usize::try_from(selected)
            .ok()
            .filter(|index| *index < branched.rules.len());
        let Some(index) = index else {
            return Err(SerializeError::new(
                SerializeErrorKind::BranchOutOfBounds {
                    selected,
                    max: branched.rules.len().saturating_sub(1),
                },
                props.clone(),
            ));
        };
        debug!(tag = name, branch = index, "selected branch");

        self.leaf(branched.rules[index].leaf(), props, fields)
            .map_err(|e| e.within(name, index))
    }

    fn recurrent(
        &mut self,
        name: &str,
        tag: &'a Tag,
        rules: &'a [RecurrentRule],
        props: &Properties,
        split: &ListSlices,
        fields: &Fields,
    ) -> Result<String, SerializeError> {
        // Slice scripts run even when no rule ends up repeating.
        let mut slice_fields = Vec::with_capacity(split.slices.len());
        for slice in &split.slices {
            slice_fields.push(self.fields(tag, slice, props)?);
        }

        let Some(length) = max_repetition(self.config, props, &tag.rules) else {
            debug!(tag = name, "no repetition length, producing empty output");
            return Ok(String::new());
        };
        let count = length.length;
        debug!(tag = name, count, priority = length.priority, "repeating rules");

        let mut result = String::new();
        for repetition in 0..count {
            let current_props = match split.slices.get(repetition) {
                Some(slice) => overlay(slice.clone(), &split.residual),
                None => split.residual.clone(),
            };
            let mut current_fields = fields.clone();
            if let Some(extra) = slice_fields.get(repetition) {
                current_fields.extend(extra.clone());
            }

            let last = repetition + 1 == count;
            for (index, rule) in rules.iter().enumerate() {
                if last && rule.is_infix() {
                    continue;
                }
                let text = self
                    .leaf(rule.leaf(), &current_props, &current_fields)
                    .map_err(|e| e.within(name, index))?;
                result.push_str(&text);
            }
        }
        Ok(result)
    }

    fn recurrent_dict(
        &mut self,
        name: &str,
        dict: &'a RecurrentDict,
        props: &Properties,
    ) -> Result<String, SerializeError> {
        let Some(PropertyValue::List(elements)) = props.get(&dict.key) else {
            return Err(SerializeError::new(
                SerializeErrorKind::RecurrentDictKeyNotFound {
                    key: dict.key.clone(),
                },
                props.clone(),
            ));
        };

        let mut result = String::new();
        for (index, element) in elements.iter().enumerate() {
            let PropertyValue::Map(element) = element else {
                return Err(SerializeError::new(
                    SerializeErrorKind::RecurrentDictElementNotMap {
                        key: dict.key.clone(),
                        index,
                    },
                    props.clone(),
                )
                .within(name, index));
            };
            let text = self
                .convert(&dict.tag, element)
                .map_err(|e| e.within(name, index))?;
            result.push_str(&text);
        }
        Ok(result)
    }

    fn leaf(
        &mut self,
        leaf: Leaf<'a>,
        props: &Properties,
        fields: &Fields,
    ) -> Result<String, SerializeError> {
        match leaf {
            Leaf::Existing(rule) => self.existing(rule, props),
            Leaf::Linear(rule) => self.linear(rule, props, fields),
        }
    }

    fn existing(&mut self, rule: &Existing, props: &Properties) -> Result<String, SerializeError> {
        match self.convert(&rule.tag, &rule.view(props)) {
            Err(e)
                if !rule.required
                    && matches!(e.kind, SerializeErrorKind::ScriptVariableNotFound { .. }) =>
            {
                debug!(tag = %rule.tag, error = %e, "optional rule produced no output");
                Ok(String::new())
            }
            result => result,
        }
    }

    fn linear(
        &mut self,
        rule: &Linear,
        props: &Properties,
        fields: &Fields,
    ) -> Result<String, SerializeError> {
        let variable_not_found = |name: String| {
            SerializeError::new(
                SerializeErrorKind::ScriptVariableNotFound { name },
                props.clone(),
            )
        };
        let resolve_failed = |detail: String| {
            SerializeError::new(
                SerializeErrorKind::ResolveRegexError { detail },
                props.clone(),
            )
        };

        let pattern = match &rule.dyn_groups {
            Some(dyn_groups) => {
                let selected =
                    compose(dyn_groups, &self.context.fields()).map_err(variable_not_found)?;
                let pattern = resolve_dynamic(&rule.pattern, &selected)
                    .map_err(|e| resolve_failed(e.to_string()))?;
                trace!(pattern = %pattern, "selected dynamic pattern");
                pattern
            }
            None => rule.pattern.clone(),
        };

        let groups = match &rule.fields {
            Some(group_fields) => compose(group_fields, fields).map_err(variable_not_found)?,
            None => GroupValues::new(),
        };
        resolve(&pattern, &groups).map_err(|e| resolve_failed(e.to_string()))
    }
}
