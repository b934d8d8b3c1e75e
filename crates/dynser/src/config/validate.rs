//! Static checks over a loaded schema.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use super::Config;
use super::rules::{Leaf, RuleTree};
use crate::interpreter::compute_suggestions;
use crate::parser::parse_pattern;
use crate::types::GroupKey;

/// A problem found in a schema without evaluating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub tag: String,
    /// Index of the offending rule, when the issue belongs to one.
    pub rule: Option<usize>,
    pub message: String,
}

impl Display for ConfigIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.rule {
            Some(rule) => write!(f, "tag '{}', rule {rule}: {}", self.tag, self.message),
            None => write!(f, "tag '{}': {}", self.tag, self.message),
        }
    }
}

pub(super) fn validate(config: &Config) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    for (name, tag) in &config.tags {
        let mut report = |rule: Option<usize>, message: String| {
            issues.push(ConfigIssue {
                tag: name.clone(),
                rule,
                message,
            });
        };

        match &tag.rules {
            RuleTree::Continual(rules) => {
                for (index, rule) in rules.iter().enumerate() {
                    check_leaf(config, rule.leaf(), |m| report(Some(index), m));
                }
            }
            RuleTree::Branched(branched) => {
                if branched.rules.is_empty() {
                    report(None, "branched tree has no rules".to_string());
                }
                for (index, rule) in branched.rules.iter().enumerate() {
                    check_leaf(config, rule.leaf(), |m| report(Some(index), m));
                }
            }
            RuleTree::Recurrent(rules) => {
                for (index, rule) in rules.iter().enumerate() {
                    check_leaf(config, rule.leaf(), |m| report(Some(index), m));
                }
            }
            RuleTree::RecurrentDict(dict) => {
                if let Some(message) = unknown_tag(config, &dict.tag) {
                    report(None, message);
                }
            }
        }
    }
    issues
}

fn check_leaf(config: &Config, leaf: Leaf<'_>, mut report: impl FnMut(String)) {
    match leaf {
        Leaf::Existing(rule) => {
            if let Some(message) = unknown_tag(config, &rule.tag) {
                report(message);
            }
        }
        Leaf::Linear(rule) => {
            let pattern = match parse_pattern(&rule.pattern) {
                Ok(pattern) => pattern,
                Err(e) => {
                    report(format!("invalid pattern '{}': {e}", rule.pattern));
                    return;
                }
            };
            for (label, groups) in [("fields", &rule.fields), ("dyn_groups", &rule.dyn_groups)] {
                for key in groups.iter().flat_map(BTreeMap::keys) {
                    if !pattern.defines(key) {
                        report(format!(
                            "{label} names group {} which pattern '{}' does not define",
                            describe_key(key),
                            rule.pattern
                        ));
                    }
                }
            }
        }
    }
}

fn unknown_tag(config: &Config, name: &str) -> Option<String> {
    if config.contains(name) {
        return None;
    }
    let suggestions = compute_suggestions(name, config.tag_names());
    if suggestions.is_empty() {
        Some(format!("unknown tag '{name}'"))
    } else {
        Some(format!(
            "unknown tag '{name}', did you mean: {}?",
            suggestions.join(", ")
        ))
    }
}

fn describe_key(key: &GroupKey) -> String {
    match key {
        GroupKey::Index(index) => format!("{index}"),
        GroupKey::Name(name) => format!("'{name}'"),
    }
}
