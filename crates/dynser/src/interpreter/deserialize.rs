//! String to properties conversion.
//!
//! A tag's patterns are compiled into a single anchored regex. Groups that a
//! rule maps to a field become named captures; existing rules are inlined
//! with their own capture scope so that the referenced tag's deserialization
//! script runs on the fields it owns. Recurrent tags are matched one
//! repetition at a time.

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::config::{Config, Leaf, Linear, RecurrentRule, Rule, RuleTree, Tag};
use crate::interpreter::compose::compose;
use crate::interpreter::context::{CallStack, Context};
use crate::interpreter::error::{DeserializeError, DeserializeErrorKind, compute_suggestions};
use crate::interpreter::resolve::{lookup, resolve_dynamic};
use crate::interpreter::script::ScriptHost;
use crate::parser::{Atom, Pattern, Quantifier, parse_pattern};
use crate::types::{Fields, GroupKey, Properties, PropertyValue, add_prefix, overlay};

/// Captures owned by one tag inside a compiled matcher.
#[derive(Debug, Default)]
struct CaptureScope {
    /// Deserialization script of the owning tag.
    script: Option<String>,
    /// Prefix the owning existing rule strips; re-applied to the result.
    prefix: Option<String>,
    /// Regex capture name to field name.
    captures: Vec<(String, String)>,
    children: Vec<CaptureScope>,
}

impl CaptureScope {
    fn root(tag: &Tag) -> Self {
        Self {
            script: tag.deserialization_script.clone(),
            ..Self::default()
        }
    }
}

/// State of one top-level `convert_back` call.
pub(crate) struct Deserializer<'a> {
    config: &'a Config,
    scripts: &'a dyn ScriptHost,
    context: &'a mut Context,
    calls: CallStack,
    next_rule: usize,
}

impl<'a> Deserializer<'a> {
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
            next_rule: 0,
        }
    }

    /// Recover the properties that the tag named `tag_name` turns into `text`.
    pub(crate) fn convert_back(
        &mut self,
        tag_name: &str,
        text: &str,
    ) -> Result<Properties, DeserializeError> {
        let tag = self.tag(tag_name, text)?;
        self.enter(tag_name, text)?;
        let result = self.convert_tag(tag_name, tag, text);
        self.calls.pop();
        result
    }

    fn convert_tag(
        &mut self,
        name: &str,
        tag: &'a Tag,
        text: &str,
    ) -> Result<Properties, DeserializeError> {
        debug!(tag = name, "matching tag");
        match &tag.rules {
            RuleTree::Continual(rules) => {
                let mut scope = CaptureScope::root(tag);
                let source =
                    self.compile_rules(name, rules.iter().map(Rule::leaf), &mut scope, text)?;
                let regex = build_regex(&format!("^(?:{source})$"), text)?;
                let Some(captures) = regex.captures(text) else {
                    return Err(no_match(name, text));
                };
                self.collect_root(&scope, &captures, text)
            }
            RuleTree::Branched(branched) => {
                for (index, rule) in branched.rules.iter().enumerate() {
                    let mut scope = CaptureScope::root(tag);
                    let source = self
                        .compile_leaf(rule.leaf(), &mut scope, text)
                        .map_err(|e| e.within(name, index))?;
                    let regex = build_regex(&format!("^(?:{source})$"), text)?;
                    if let Some(captures) = regex.captures(text) {
                        debug!(tag = name, branch = index, "matched branch");
                        return self
                            .collect_root(&scope, &captures, text)
                            .map_err(|e| e.within(name, index));
                    }
                }
                Err(no_match(name, text))
            }
            RuleTree::Recurrent(rules) => self.recurrent(name, tag, rules, text),
            RuleTree::RecurrentDict(_) => Err(unsupported(
                format!("recurrent_dict tag '{name}'"),
                text,
            )),
        }
    }

    /// Match repetitions from the front of `text`.
    ///
    /// Every repetition but the last must match the rules including infix
    /// rules and leave text behind; the last must match the remaining text
    /// without infix rules.
    fn recurrent(
        &mut self,
        name: &str,
        tag: &'a Tag,
        rules: &'a [RecurrentRule],
        text: &str,
    ) -> Result<Properties, DeserializeError> {
        let mut full_scope = CaptureScope::root(tag);
        let full = self.compile_rules(
            name,
            rules.iter().map(RecurrentRule::leaf),
            &mut full_scope,
            text,
        )?;
        let mut last_scope = CaptureScope::root(tag);
        let last = self.compile_rules(
            name,
            rules
                .iter()
                .filter(|rule| !rule.is_infix())
                .map(RecurrentRule::leaf),
            &mut last_scope,
            text,
        )?;
        let full = build_regex(&format!("^(?:{full})"), text)?;
        let last = build_regex(&format!("^(?:{last})$"), text)?;

        let mut repetitions = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if let Some(captures) = full.captures(rest) {
                let end = captures.get(0).map_or(0, |m| m.end());
                if end > 0 && end < rest.len() {
                    repetitions.push(self.collect_root(&full_scope, &captures, rest)?);
                    rest = &rest[end..];
                    continue;
                }
            }
            let Some(captures) = last.captures(rest) else {
                return Err(no_match(name, rest).within(name, repetitions.len()));
            };
            repetitions.push(self.collect_root(&last_scope, &captures, rest)?);
            rest = "";
        }
        debug!(tag = name, count = repetitions.len(), "matched repetitions");

        let mut lists: BTreeMap<String, Vec<PropertyValue>> = BTreeMap::new();
        for props in repetitions {
            for (key, value) in props {
                lists.entry(key).or_default().push(value);
            }
        }
        Ok(lists
            .into_iter()
            .map(|(key, items)| (key, PropertyValue::List(items)))
            .collect())
    }

    fn tag(&self, name: &str, text: &str) -> Result<&'a Tag, DeserializeError> {
        let config = self.config;
        config.get(name).ok_or_else(|| {
            DeserializeError::new(
                DeserializeErrorKind::TagNotFound {
                    tag: name.to_string(),
                    suggestions: compute_suggestions(name, config.tag_names()),
                },
                text,
            )
        })
    }

    fn enter(&mut self, name: &str, text: &str) -> Result<(), DeserializeError> {
        self.calls.push(name).map_err(|depth| {
            DeserializeError::new(DeserializeErrorKind::MaxDepthExceeded { depth }, text)
        })
    }

    /// Compile leaf rules in sequence, registering their captures in `scope`.
    fn compile_rules(
        &mut self,
        name: &str,
        leaves: impl Iterator<Item = Leaf<'a>>,
        scope: &mut CaptureScope,
        text: &str,
    ) -> Result<String, DeserializeError> {
        let mut source = String::new();
        for (index, leaf) in leaves.enumerate() {
            let fragment = self
                .compile_leaf(leaf, scope, text)
                .map_err(|e| e.within(name, index))?;
            source.push_str(&fragment);
        }
        Ok(source)
    }

    fn compile_leaf(
        &mut self,
        leaf: Leaf<'a>,
        scope: &mut CaptureScope,
        text: &str,
    ) -> Result<String, DeserializeError> {
        match leaf {
            Leaf::Linear(rule) => self.compile_linear(rule, &mut scope.captures, text),
            Leaf::Existing(rule) => self.compile_existing(
                &rule.tag,
                rule.prefix.as_deref(),
                rule.required,
                scope,
                text,
            ),
        }
    }

    /// Inline a referenced tag as a nested capture scope.
    ///
    /// Non-required references become optional. A reference back into a tag
    /// that is being compiled cannot be expressed as a regex and is dropped
    /// when optional.
    fn compile_existing(
        &mut self,
        tag_name: &str,
        prefix: Option<&str>,
        required: bool,
        parent: &mut CaptureScope,
        text: &str,
    ) -> Result<String, DeserializeError> {
        if self.calls.contains(tag_name) {
            if required {
                return Err(unsupported(
                    format!("recursive reference to tag '{tag_name}'"),
                    text,
                ));
            }
            trace!(tag = tag_name, "dropping optional recursive reference");
            return Ok(String::new());
        }

        let tag = self.tag(tag_name, text)?;
        self.enter(tag_name, text)?;
        let mut scope = CaptureScope {
            script: tag.deserialization_script.clone(),
            prefix: prefix.map(str::to_string),
            ..CaptureScope::default()
        };
        let compiled = match &tag.rules {
            RuleTree::Continual(rules) => {
                self.compile_rules(tag_name, rules.iter().map(Rule::leaf), &mut scope, text)
            }
            RuleTree::Branched(branched) => branched
                .rules
                .iter()
                .enumerate()
                .map(|(index, rule)| {
                    self.compile_leaf(rule.leaf(), &mut scope, text)
                        .map(|source| format!("(?:{source})"))
                        .map_err(|e| e.within(tag_name, index))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|alternatives| alternatives.join("|")),
            RuleTree::Recurrent(_) => Err(unsupported(
                format!("recurrent tag '{tag_name}' referenced by an existing rule"),
                text,
            )),
            RuleTree::RecurrentDict(_) => Err(unsupported(
                format!("recurrent_dict tag '{tag_name}' referenced by an existing rule"),
                text,
            )),
        };
        self.calls.pop();

        let source = compiled?;
        parent.children.push(scope);
        Ok(if required {
            format!("(?:{source})")
        } else {
            format!("(?:{source})?")
        })
    }

    fn compile_linear(
        &mut self,
        rule: &Linear,
        captures: &mut Vec<(String, String)>,
        text: &str,
    ) -> Result<String, DeserializeError> {
        let pattern_text = self.select_pattern(rule);
        let pattern = parse_pattern(&pattern_text).map_err(|e| {
            DeserializeError::new(
                DeserializeErrorKind::Pattern {
                    pattern: pattern_text.clone(),
                    detail: e.to_string(),
                },
                text,
            )
        })?;

        let mut translator = Translator {
            rule_id: self.next_rule,
            fields: rule.fields.as_ref(),
            captures,
            output: String::new(),
        };
        self.next_rule += 1;
        translator.pattern(&pattern);
        Ok(format!("(?:{})", translator.output))
    }

    /// The rule's pattern with dynamic groups substituted from the context.
    ///
    /// When the context lacks a selector field, the static pattern is used.
    fn select_pattern(&self, rule: &Linear) -> String {
        let Some(dyn_groups) = &rule.dyn_groups else {
            return rule.pattern.clone();
        };
        let selected = match compose(dyn_groups, &self.context.fields()) {
            Ok(selected) => selected,
            Err(field) => {
                debug!(field = %field, "context field missing, matching static pattern");
                return rule.pattern.clone();
            }
        };
        resolve_dynamic(&rule.pattern, &selected).unwrap_or_else(|e| {
            debug!(error = %e, "dynamic pattern rejected, matching static pattern");
            rule.pattern.clone()
        })
    }

    fn collect_root(
        &mut self,
        scope: &CaptureScope,
        captures: &Captures<'_>,
        text: &str,
    ) -> Result<Properties, DeserializeError> {
        self.collect(scope, captures, text, true)
            .map(Option::unwrap_or_default)
    }

    /// Turn the captures of `scope` into properties.
    ///
    /// Nested scopes whose captures all missed produce nothing. The owning
    /// tag's properties win over those of nested tags.
    fn collect(
        &mut self,
        scope: &CaptureScope,
        captures: &Captures<'_>,
        text: &str,
        root: bool,
    ) -> Result<Option<Properties>, DeserializeError> {
        let mut fields = Fields::new();
        for (group, field) in &scope.captures {
            if let Some(m) = captures.name(group) {
                fields
                    .entry(field.clone())
                    .or_insert_with(|| m.as_str().to_string());
            }
        }

        let mut nested = Properties::new();
        for child in &scope.children {
            let Some(props) = self.collect(child, captures, text, false)? else {
                continue;
            };
            let props = match &child.prefix {
                Some(prefix) => add_prefix(props, prefix),
                None => props,
            };
            for (key, value) in props {
                nested.entry(key).or_insert(value);
            }
        }

        if !root && fields.is_empty() && nested.is_empty() {
            return Ok(None);
        }
        let own = self.properties(scope.script.as_deref(), fields, text)?;
        Ok(Some(overlay(own, &nested)))
    }

    /// Run a deserialization script, or take the fields as string properties.
    fn properties(
        &mut self,
        script: Option<&str>,
        fields: Fields,
        text: &str,
    ) -> Result<Properties, DeserializeError> {
        match script {
            Some(script) => self
                .scripts
                .to_properties(script, self.context, &fields)
                .map_err(|e| {
                    DeserializeError::new(
                        DeserializeErrorKind::ScriptError { message: e.message },
                        text,
                    )
                }),
            None => Ok(fields
                .into_iter()
                .map(|(key, value)| (key, PropertyValue::String(value)))
                .collect()),
        }
    }
}

/// Writes a parsed pattern as regex source, naming the captures that the
/// rule maps to fields.
struct Translator<'r> {
    rule_id: usize,
    fields: Option<&'r BTreeMap<GroupKey, String>>,
    captures: &'r mut Vec<(String, String)>,
    output: String,
}

impl Translator<'_> {
    fn pattern(&mut self, pattern: &Pattern) {
        for (index, branch) in pattern.branches.iter().enumerate() {
            if index > 0 {
                self.output.push('|');
            }
            for item in &branch.items {
                self.item(&item.atom, item.quantifier);
            }
        }
    }

    fn item(&mut self, atom: &Atom, quantifier: Option<Quantifier>) {
        let suffix = quantifier.map(|q| q.to_string()).unwrap_or_default();
        match atom {
            Atom::Literal(c) => {
                self.output.push_str(&regex::escape(&c.to_string()));
                self.output.push_str(&suffix);
            }
            Atom::Class(source) | Atom::Anchor(source) => {
                self.output.push_str(source);
                self.output.push_str(&suffix);
            }
            Atom::Placeholder(placeholder) => {
                let capture = self.capture_name(placeholder.index, Some(&placeholder.name));
                let close = self.open(capture.as_deref(), quantifier);
                self.output.push_str(".*?");
                self.output.push_str(&close);
            }
            Atom::Group(group) => {
                let capture = group
                    .index
                    .and_then(|index| self.capture_name(index, group.name.as_deref()));
                let close = self.open(capture.as_deref(), quantifier);
                self.pattern(&group.body);
                self.output.push_str(&close);
            }
        }
    }

    /// Write the opening of a group and return its closing text.
    ///
    /// A capture under a repeating quantifier captures every repetition, the
    /// way the template renders one value for the whole item.
    fn open(&mut self, capture: Option<&str>, quantifier: Option<Quantifier>) -> String {
        let suffix = quantifier.map(|q| q.to_string()).unwrap_or_default();
        let repeats = quantifier.is_some_and(|q| q.max != Some(1));
        match capture {
            Some(name) if repeats => {
                self.output.push_str(&format!("(?P<{name}>(?:"));
                format!("){suffix})")
            }
            Some(name) => {
                self.output.push_str(&format!("(?P<{name}>"));
                format!("){suffix}")
            }
            None => {
                self.output.push_str("(?:");
                format!("){suffix}")
            }
        }
    }

    /// Name the capture for a group the rule maps to a field.
    fn capture_name(&mut self, index: usize, name: Option<&str>) -> Option<String> {
        let field = lookup(self.fields?, index, name)?;
        let capture = format!("g{}_{index}", self.rule_id);
        self.captures.push((capture.clone(), field.clone()));
        Some(capture)
    }
}

fn build_regex(source: &str, text: &str) -> Result<Regex, DeserializeError> {
    trace!(source, "compiling matcher");
    Regex::new(&format!("(?s){source}")).map_err(|e| {
        DeserializeError::new(
            DeserializeErrorKind::Regex {
                detail: e.to_string(),
            },
            text,
        )
    })
}

fn no_match(tag: &str, text: &str) -> DeserializeError {
    DeserializeError::new(
        DeserializeErrorKind::NoMatch {
            tag: tag.to_string(),
        },
        text,
    )
}

fn unsupported(construct: String, text: &str) -> DeserializeError {
    DeserializeError::new(DeserializeErrorKind::Unsupported { construct }, text)
}
