//! YAML schema loading.
//!
//! The file format is read into raw serde structs first, then checked and
//! converted into the rule tree types. Each rule is a single-key map
//! (`linear`, `existing` or `infix`) and each tag names exactly one tree kind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::rules::{Branched, Existing, Linear, RecurrentDict, RecurrentRule, Rule, RuleTree};
use super::{Config, Tag};

/// Errors that occur while loading a schema.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error when reading a schema file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape error with its location.
    #[error("{}{line}:{column}: {message}", location_prefix(path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        line: usize,
        column: usize,
        message: String,
    },

    /// Well-formed YAML describing an impossible schema.
    #[error("{message}")]
    Invalid { message: String },
}

fn location_prefix(path: Option<&Path>) -> String {
    path.map(|p| format!("{}:", p.display())).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    tags: BTreeMap<String, RawTag>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTag {
    serialization_script: Option<String>,
    deserialization_script: Option<String>,
    continual: Option<Vec<RawRule>>,
    branched: Option<RawBranched>,
    recurrent: Option<Vec<RawRule>>,
    recurrent_dict: Option<RecurrentDict>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBranched {
    script: String,
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    existing: Option<Existing>,
    linear: Option<Linear>,
    infix: Option<Linear>,
}

pub(super) fn parse_yaml(text: &str, path: Option<&Path>) -> Result<Config, LoadError> {
    if text.trim().is_empty() {
        return Ok(Config::new());
    }

    let raw: RawConfig = serde_yaml::from_str(text).map_err(|e| {
        let (line, column) = e
            .location()
            .map_or((1, 1), |location| (location.line(), location.column()));
        LoadError::Parse {
            path: path.map(Path::to_path_buf),
            line,
            column,
            message: e.to_string(),
        }
    })?;

    let mut config = Config::new();
    for (name, raw_tag) in raw.tags {
        let tag = convert_tag(raw_tag).map_err(|message| LoadError::Invalid {
            message: format!("tag '{name}': {message}"),
        })?;
        config.insert(name, tag);
    }
    Ok(config)
}

fn convert_tag(raw: RawTag) -> Result<Tag, String> {
    let RawTag {
        serialization_script,
        deserialization_script,
        continual,
        branched,
        recurrent,
        recurrent_dict,
    } = raw;

    let mut trees = Vec::new();
    if let Some(rules) = continual {
        trees.push(RuleTree::Continual(convert_rules(rules)?));
    }
    if let Some(branched) = branched {
        trees.push(RuleTree::Branched(Branched {
            script: branched.script,
            rules: convert_rules(branched.rules)?,
        }));
    }
    if let Some(rules) = recurrent {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                convert_recurrent_rule(rule).map_err(|e| format!("rule {index}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        trees.push(RuleTree::Recurrent(rules));
    }
    if let Some(dict) = recurrent_dict {
        trees.push(RuleTree::RecurrentDict(dict));
    }

    if trees.len() != 1 {
        return Err(format!(
            "expected exactly one of continual, branched, recurrent, recurrent_dict; found {}",
            trees.len()
        ));
    }
    let Some(rules) = trees.pop() else {
        return Err("missing rule tree".to_string());
    };

    Ok(Tag {
        rules,
        serialization_script,
        deserialization_script,
    })
}

fn convert_rules(rules: Vec<RawRule>) -> Result<Vec<Rule>, String> {
    rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| convert_rule(rule).map_err(|e| format!("rule {index}: {e}")))
        .collect()
}

fn convert_rule(raw: RawRule) -> Result<Rule, String> {
    match convert_recurrent_rule(raw)? {
        RecurrentRule::Existing(rule) => Ok(Rule::Existing(rule)),
        RecurrentRule::Linear(rule) => Ok(Rule::Linear(rule)),
        RecurrentRule::Infix(_) => Err("infix rules are only allowed in recurrent trees".to_string()),
    }
}

fn convert_recurrent_rule(raw: RawRule) -> Result<RecurrentRule, String> {
    match (raw.existing, raw.linear, raw.infix) {
        (Some(rule), None, None) => Ok(RecurrentRule::Existing(rule)),
        (None, Some(rule), None) => Ok(RecurrentRule::Linear(rule)),
        (None, None, Some(rule)) => Ok(RecurrentRule::Infix(rule)),
        _ => Err("expected exactly one of existing, linear, infix".to_string()),
    }
}
