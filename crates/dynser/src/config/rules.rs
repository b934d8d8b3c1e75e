//! Rule trees: the shape of the string a tag produces.

use std::collections::BTreeMap;

use bon::Builder;
use serde::Deserialize;

use crate::types::{GroupKey, Properties, overlay, remove_prefix};

/// Priority of a rule when competing list lengths decide a repetition count.
pub type Priority = i32;

/// The rule tree owned by a tag.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTree {
    /// Leaf rules evaluated in order and concatenated.
    Continual(Vec<Rule>),
    /// A script selects exactly one rule to evaluate.
    Branched(Branched),
    /// Leaf rules evaluated once per repetition index.
    Recurrent(Vec<RecurrentRule>),
    /// A list of maps, each converted with another tag.
    RecurrentDict(RecurrentDict),
}

/// A leaf rule of a continual or branched tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Existing(Existing),
    Linear(Linear),
}

/// A leaf rule of a recurrent tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RecurrentRule {
    Existing(Existing),
    Linear(Linear),
    /// Emitted between repetitions, suppressed after the last one.
    Infix(Linear),
}

/// Borrowed view of the two leaf rule kinds shared by every tree.
#[derive(Debug, Clone, Copy)]
pub enum Leaf<'a> {
    Existing(&'a Existing),
    Linear(&'a Linear),
}

impl Rule {
    pub fn leaf(&self) -> Leaf<'_> {
        match self {
            Rule::Existing(rule) => Leaf::Existing(rule),
            Rule::Linear(rule) => Leaf::Linear(rule),
        }
    }
}

impl RecurrentRule {
    /// Infix rules are linear rules for everything but repetition placement.
    pub fn leaf(&self) -> Leaf<'_> {
        match self {
            RecurrentRule::Existing(rule) => Leaf::Existing(rule),
            RecurrentRule::Linear(rule) | RecurrentRule::Infix(rule) => Leaf::Linear(rule),
        }
    }

    pub fn is_infix(&self) -> bool {
        matches!(self, RecurrentRule::Infix(_))
    }
}

/// A branching script and the rules it selects between.
///
/// The script assigns the index of the rule to evaluate to the `BRANCH`
/// variable.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Branched {
    #[builder(into)]
    pub script: String,
    pub rules: Vec<Rule>,
}

/// Converts each map of the list under `key` with the tag `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
pub struct RecurrentDict {
    #[builder(into)]
    pub key: String,
    #[builder(into)]
    pub tag: String,
}

fn default_required() -> bool {
    true
}

/// Delegates to another tag.
///
/// # Example
///
/// ```
/// use dynser::props;
/// use dynser::config::Existing;
///
/// let rule = Existing::builder().tag("point").prefix("from").build();
/// let view = rule.view(&props! { "from.point.x" => "1", "from.y" => "2", "z" => "3" });
/// assert_eq!(view["x"], "1".into());
/// assert_eq!(view["y"], "2".into());
/// assert!(!view.contains_key("z"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
pub struct Existing {
    /// Name of the referenced tag.
    #[builder(into)]
    pub tag: String,

    /// Key prefix stripped from the properties before delegating.
    #[builder(into)]
    #[serde(default)]
    pub prefix: Option<String>,

    /// When false, a nested conversion failing with an unresolved script
    /// variable yields an empty string instead of an error.
    #[builder(default = true)]
    #[serde(default = "default_required")]
    pub required: bool,

    /// Overrides the referenced tag's priority in repetition counting.
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl Existing {
    /// The properties the referenced tag sees.
    ///
    /// With a rule prefix, only the keys carrying it are passed on, stripped.
    /// Keys prefixed with the referenced tag's name are then stripped as well
    /// and take precedence over same-named keys.
    pub fn view(&self, props: &Properties) -> Properties {
        let stripped = match &self.prefix {
            Some(prefix) => remove_prefix(props, prefix),
            None => props.clone(),
        };
        overlay(remove_prefix(&stripped, &self.tag), &stripped)
    }
}

/// Fills a pattern with field values.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use dynser::GroupKey;
/// use dynser::config::Linear;
///
/// let rule = Linear::builder()
///     .pattern("{x},{y}")
///     .fields(BTreeMap::from([
///         (GroupKey::Index(1), "x".to_string()),
///         (GroupKey::Index(2), "y".to_string()),
///     ]))
///     .build();
/// assert_eq!(rule.priority, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
pub struct Linear {
    #[builder(into)]
    pub pattern: String,

    /// Capture group to field name.
    #[serde(default)]
    pub fields: Option<BTreeMap<GroupKey, String>>,

    /// Capture group to context field name. The selected context values are
    /// substituted into the pattern before the static fields are filled.
    #[serde(default)]
    pub dyn_groups: Option<BTreeMap<GroupKey, String>>,

    /// Overrides the default priority of 0 in repetition counting.
    #[serde(default)]
    pub priority: Option<Priority>,
}
