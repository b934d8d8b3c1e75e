//! AST types for parsed patterns.
//!
//! Patterns are regex-shaped templates. The AST keeps enough of the source to
//! print a pattern back as text (see the `Display` impls), which is how
//! dynamic pattern selection hands a rewritten pattern to the resolver.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::types::GroupKey;

/// A parsed pattern: one or more alternatives separated by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub branches: Vec<Sequence>,
}

/// A sequence of quantified atoms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    pub items: Vec<Item>,
}

/// An atom with an optional quantifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub atom: Atom,
    pub quantifier: Option<Quantifier>,
}

/// The smallest unit of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// A literal character (escaped or not in the source).
    Literal(char),
    /// A character class: `[...]`, `.`, `\d`, `\w`, `\s` and their negations.
    Class(String),
    /// A zero-width assertion: `^`, `$`, `\b`, `\B`.
    Anchor(String),
    /// A parenthesized group, capturing or not.
    Group(Group),
    /// A `{name}` placeholder: a capturing group with no body.
    Placeholder(Placeholder),
}

/// A parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group number for capturing groups, `None` for `(?:...)`.
    pub index: Option<usize>,
    /// Name for `(?<name>...)` and `(?P<name>...)` groups.
    pub name: Option<String>,
    pub body: Pattern,
}

/// A `{name}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub index: usize,
    pub name: String,
}

/// Repetition bounds: `?`, `*`, `+`, `{n}`, `{n,}`, `{n,m}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
}

/// A capturing group as seen from outside the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub index: usize,
    pub name: Option<String>,
}

impl GroupInfo {
    /// Check whether `key` addresses this group.
    pub fn matches(&self, key: &GroupKey) -> bool {
        match key {
            GroupKey::Index(index) => *index == self.index,
            GroupKey::Name(name) => self.name.as_deref() == Some(name.as_str()),
        }
    }
}

impl Pattern {
    /// A pattern that matches the empty string.
    pub fn empty() -> Self {
        Pattern {
            branches: vec![Sequence::default()],
        }
    }

    /// All capturing groups and placeholders in order of opening position.
    pub fn groups(&self) -> Vec<GroupInfo> {
        let mut groups = Vec::new();
        collect_groups(self, &mut groups);
        groups
    }

    /// Check whether the pattern defines a group addressed by `key`.
    pub fn defines(&self, key: &GroupKey) -> bool {
        self.groups().iter().any(|group| group.matches(key))
    }
}

fn collect_groups(pattern: &Pattern, groups: &mut Vec<GroupInfo>) {
    for item in pattern.branches.iter().flat_map(|branch| &branch.items) {
        match &item.atom {
            Atom::Group(group) => {
                if let Some(index) = group.index {
                    groups.push(GroupInfo {
                        index,
                        name: group.name.clone(),
                    });
                }
                collect_groups(&group.body, groups);
            }
            Atom::Placeholder(placeholder) => groups.push(GroupInfo {
                index: placeholder.index,
                name: Some(placeholder.name.clone()),
            }),
            Atom::Literal(_) | Atom::Class(_) | Atom::Anchor(_) => {}
        }
    }
}

impl Quantifier {
    pub const OPTIONAL: Quantifier = Quantifier {
        min: 0,
        max: Some(1),
    };
    pub const ANY: Quantifier = Quantifier { min: 0, max: None };
    pub const AT_LEAST_ONE: Quantifier = Quantifier { min: 1, max: None };

    /// Largest bound a counted quantifier may name.
    pub const MAX_COUNT: u32 = 1000;
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (index, branch) in self.branches.iter().enumerate() {
            if index > 0 {
                write!(f, "|")?;
            }
            write!(f, "{branch}")?;
        }
        Ok(())
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.items {
            write!(f, "{}", item.atom)?;
            if let Some(quantifier) = item.quantifier {
                write!(f, "{quantifier}")?;
            }
        }
        Ok(())
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Atom::Literal(c) => write_literal(f, *c),
            Atom::Class(source) | Atom::Anchor(source) => write!(f, "{source}"),
            Atom::Group(group) => match (&group.index, &group.name) {
                (None, _) => write!(f, "(?:{})", group.body),
                (Some(_), Some(name)) => write!(f, "(?<{name}>{})", group.body),
                (Some(_), None) => write!(f, "({})", group.body),
            },
            Atom::Placeholder(placeholder) => write!(f, "{{{}}}", placeholder.name),
        }
    }
}

impl Display for Quantifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (self.min, self.max) {
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (min, None) => write!(f, "{{{min},}}"),
            (min, Some(max)) if min == max => write!(f, "{{{min}}}"),
            (min, Some(max)) => write!(f, "{{{min},{max}}}"),
        }
    }
}

/// Characters that must be escaped to be read back as literals.
pub(crate) const META_CHARACTERS: &[char] = &[
    '\\', '(', ')', '|', '*', '+', '?', '[', ']', '{', '}', '.', '^', '$',
];

fn write_literal(f: &mut Formatter<'_>, c: char) -> FmtResult {
    match c {
        '\n' => write!(f, "\\n"),
        '\t' => write!(f, "\\t"),
        '\r' => write!(f, "\\r"),
        c if META_CHARACTERS.contains(&c) => write!(f, "\\{c}"),
        c => write!(f, "{c}"),
    }
}
