//! Error types for conversions in both directions.

use std::fmt::{Display, Formatter, Result as FmtResult};

use strsim::levenshtein;
use thiserror::Error;

use crate::parser::ParseError;
use crate::types::Properties;

/// Locates a failure: the tag being converted and the index of the rule,
/// branch or repetition element that failed inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRef {
    pub tag: String,
    pub rule_index: usize,
}

impl Display for ErrorRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "in tag '{}', rule {}", self.tag, self.rule_index)
    }
}

/// The failure behind a [`SerializeError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeErrorKind {
    /// No schema has been loaded into the converter.
    #[error("no schema loaded")]
    ConfigNotLoaded,

    /// The requested or referenced tag does not exist.
    #[error("tag not found: '{tag}'{}", format_suggestions(suggestions))]
    TagNotFound {
        tag: String,
        suggestions: Vec<String>,
    },

    /// The branching script never assigned `BRANCH`.
    #[error("branching script did not select a branch")]
    BranchNotSet,

    /// The branching script selected a branch that does not exist.
    #[error("branch {selected} selected, but the last branch is {max}")]
    BranchOutOfBounds { selected: i64, max: usize },

    /// A script failed to run; the message is the engine's diagnostic.
    #[error("script error: {message}")]
    ScriptError { message: String },

    /// A template field has no value after the script ran.
    #[error("script variable not found: '{name}'")]
    ScriptVariableNotFound { name: String },

    /// A template could not be filled.
    #[error("cannot resolve pattern: {detail}")]
    ResolveRegexError { detail: String },

    /// The key of a recurrent dict is missing or does not hold a list.
    #[error("recurrent dict key not found: '{key}'")]
    RecurrentDictKeyNotFound { key: String },

    /// An element of a recurrent dict list is not a map.
    #[error("element {index} of '{key}' is not a map")]
    RecurrentDictElementNotMap { key: String, index: usize },

    /// Tag references nest deeper than the converter allows.
    #[error("maximum tag nesting depth of {depth} exceeded")]
    MaxDepthExceeded { depth: usize },

    #[error("unknown error")]
    Unknown,
}

/// A failed `convert` call.
///
/// The trace is stored innermost first: each enclosing tag frame appends its
/// own locator while the error unwinds. `Display` prints it outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{kind}", format_trace(trace))]
pub struct SerializeError {
    pub kind: SerializeErrorKind,
    /// The properties being converted where the failure happened.
    pub scope: Properties,
    pub trace: Vec<ErrorRef>,
}

impl SerializeError {
    pub fn new(kind: SerializeErrorKind, scope: Properties) -> Self {
        Self {
            kind,
            scope,
            trace: Vec::new(),
        }
    }

    /// Append the locator of an enclosing frame.
    pub fn within(mut self, tag: &str, rule_index: usize) -> Self {
        self.trace.push(ErrorRef {
            tag: tag.to_string(),
            rule_index,
        });
        self
    }
}

/// The failure behind a [`DeserializeError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializeErrorKind {
    #[error("no schema loaded")]
    ConfigNotLoaded,

    #[error("tag not found: '{tag}'{}", format_suggestions(suggestions))]
    TagNotFound {
        tag: String,
        suggestions: Vec<String>,
    },

    /// The text does not have the shape the tag describes.
    #[error("text does not match tag '{tag}'")]
    NoMatch { tag: String },

    #[error("script error: {message}")]
    ScriptError { message: String },

    /// A pattern of the tag failed to parse.
    #[error("invalid pattern '{pattern}': {detail}")]
    Pattern { pattern: String, detail: String },

    /// The matcher built from the tag's patterns was rejected.
    #[error("cannot build matcher: {detail}")]
    Regex { detail: String },

    #[error("maximum tag nesting depth of {depth} exceeded")]
    MaxDepthExceeded { depth: usize },

    /// The tag uses a rule construct that cannot be matched back.
    #[error("cannot match {construct} back to properties")]
    Unsupported { construct: String },

    #[error("unknown error")]
    Unknown,
}

/// A failed `convert_back` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{kind}", format_trace(trace))]
pub struct DeserializeError {
    pub kind: DeserializeErrorKind,
    /// The text being matched where the failure happened.
    pub scope: String,
    pub trace: Vec<ErrorRef>,
}

impl DeserializeError {
    pub fn new(kind: DeserializeErrorKind, scope: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            trace: Vec::new(),
        }
    }

    pub fn within(mut self, tag: &str, rule_index: usize) -> Self {
        self.trace.push(ErrorRef {
            tag: tag.to_string(),
            rule_index,
        });
        self
    }
}

/// Errors from filling a pattern with group values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid pattern: {0}")]
    Syntax(#[from] ParseError),

    /// A group or placeholder that must be filled has no value.
    #[error("no value for group {group}")]
    MissingGroup { group: String },

    /// A value was given for a group the pattern does not define.
    #[error("pattern has no group {group}")]
    UnknownGroup { group: String },

    /// A construct that matches unknown text has no value to render.
    #[error("cannot render '{construct}' without a value")]
    NotRenderable { construct: String },

    /// Repeated items would render more text than allowed.
    #[error("rendered text exceeds {limit} bytes")]
    TooLong { limit: usize },

    /// A dynamic pattern tried to introduce its own capture groups.
    #[error("dynamic pattern '{pattern}' for group {group} must not contain capture groups")]
    DynamicCapture { group: String, pattern: String },
}

fn format_trace(trace: &[ErrorRef]) -> String {
    if trace.is_empty() {
        return String::new();
    }
    let frames: Vec<String> = trace.iter().rev().map(ToString::to_string).collect();
    format!("{}: ", frames.join(" -> "))
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}

/// Compute typo suggestions using Levenshtein distance.
///
/// Allows a distance of 1 for names of up to 3 characters and 2 for longer
/// names. Returns at most 3 suggestions, closest first.
pub fn compute_suggestions<'a>(
    name: &str,
    available: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let max_distance = if name.len() <= 3 { 1 } else { 2 };
    let mut suggestions: Vec<(usize, String)> = available
        .into_iter()
        .filter_map(|candidate| {
            let dist = levenshtein(name, candidate);
            (dist > 0 && dist <= max_distance).then(|| (dist, candidate.to_string()))
        })
        .collect();

    suggestions.sort_by_key(|(dist, _)| *dist);
    suggestions.into_iter().take(3).map(|(_, s)| s).collect()
}
