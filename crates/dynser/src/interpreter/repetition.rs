//! Repetition counting for recurrent trees.

use std::collections::BTreeMap;

use crate::config::{Config, Leaf, Priority, RuleTree};
use crate::types::{Properties, PropertyValue};

/// A candidate repetition count and the priority it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionLength {
    pub priority: Priority,
    pub length: usize,
}

impl RepetitionLength {
    /// Whether `self` wins over `other`: strictly higher priority, or equal
    /// priority and strictly longer length.
    fn beats(&self, other: &RepetitionLength) -> bool {
        self.priority > other.priority
            || (self.priority == other.priority && self.length > other.length)
    }
}

/// Determine how many repetitions `tree` produces for `props`.
///
/// Linear rules contribute the longest list among the properties their field
/// map names. Existing rules contribute the count of the referenced tag's
/// tree. `None` means no rule determines a length.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use dynser::{props, Config, GroupKey};
/// use dynser::config::{Linear, RecurrentRule, RuleTree};
/// use dynser::interpreter::max_repetition;
///
/// let tree = RuleTree::Recurrent(vec![RecurrentRule::Linear(
///     Linear::builder()
///         .pattern("{v}")
///         .fields(BTreeMap::from([(GroupKey::Index(1), "v".to_string())]))
///         .build(),
/// )]);
/// let length = max_repetition(&Config::new(), &props! { "v" => vec!["1", "2"] }, &tree);
/// assert_eq!(length.map(|l| l.length), Some(2));
/// ```
pub fn max_repetition(
    config: &Config,
    props: &Properties,
    tree: &RuleTree,
) -> Option<RepetitionLength> {
    let mut visiting = Vec::new();
    tree_length(config, props, tree, &mut visiting)
}

fn tree_length<'c>(
    config: &'c Config,
    props: &Properties,
    tree: &'c RuleTree,
    visiting: &mut Vec<&'c str>,
) -> Option<RepetitionLength> {
    match tree {
        RuleTree::RecurrentDict(dict) => props.get(&dict.key).map(|value| RepetitionLength {
            priority: 0,
            length: value.as_list().map_or(0, Vec::len),
        }),
        RuleTree::Continual(rules) => best(
            rules
                .iter()
                .map(|rule| leaf_length(config, props, rule.leaf(), visiting)),
        ),
        RuleTree::Branched(branched) => best(
            branched
                .rules
                .iter()
                .map(|rule| leaf_length(config, props, rule.leaf(), visiting)),
        ),
        RuleTree::Recurrent(rules) => best(
            rules
                .iter()
                .map(|rule| leaf_length(config, props, rule.leaf(), visiting)),
        ),
    }
}

fn best(candidates: impl Iterator<Item = Option<RepetitionLength>>) -> Option<RepetitionLength> {
    candidates.flatten().fold(None, |best, candidate| match best {
        Some(current) if !candidate.beats(&current) => Some(current),
        _ => Some(candidate),
    })
}

fn leaf_length<'c>(
    config: &'c Config,
    props: &Properties,
    leaf: Leaf<'c>,
    visiting: &mut Vec<&'c str>,
) -> Option<RepetitionLength> {
    match leaf {
        Leaf::Existing(rule) => {
            // A tag that is already being measured adds nothing.
            if visiting.contains(&rule.tag.as_str()) {
                return None;
            }
            let (name, tag) = config.tags.get_key_value(&rule.tag)?;
            visiting.push(name);
            let nested = tree_length(config, &rule.view(props), &tag.rules, visiting);
            visiting.pop();
            nested.map(|length| RepetitionLength {
                priority: rule.priority.unwrap_or(length.priority),
                ..length
            })
        }
        Leaf::Linear(rule) => {
            let fields = rule.fields.as_ref()?;
            let length = longest_list(props, fields)?;
            Some(RepetitionLength {
                priority: rule.priority.unwrap_or(0),
                length,
            })
        }
    }
}

fn longest_list<K>(props: &Properties, fields: &BTreeMap<K, String>) -> Option<usize> {
    fields
        .values()
        .filter_map(|name| match props.get(name) {
            Some(PropertyValue::List(items)) => Some(items.len()),
            _ => None,
        })
        .max()
}
