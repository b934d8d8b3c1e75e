//! Template filling.
//!
//! `resolve` renders a pattern with known group values. It never matches
//! anything: every construct must either have a value or render to fixed
//! text on its own.

use std::collections::BTreeMap;

use crate::interpreter::error::ResolveError;
use crate::parser::{Atom, Group, Item, Pattern, Sequence, parse_pattern};
use crate::types::GroupKey;

/// Upper bound on the text one `resolve` call renders.
pub(crate) const MAX_RENDERED_LEN: usize = 1 << 20;

/// Values for capture groups, addressed by index or name.
pub type GroupValues = BTreeMap<GroupKey, String>;

/// Fill `pattern` with `groups`.
///
/// A group with a value renders the value once, whatever its quantifier. A
/// capturing group without a value renders its body. An optional item renders
/// nothing unless it contains a group with a value. Alternation renders the
/// first alternative that renders.
///
/// # Example
///
/// ```
/// use dynser::GroupKey;
/// use dynser::interpreter::{GroupValues, resolve};
///
/// let groups = GroupValues::from([(GroupKey::Index(1), "3".to_string())]);
/// assert_eq!(resolve(r"\(({x})?\)", &groups).unwrap(), "(3)");
/// ```
pub fn resolve(pattern: &str, groups: &GroupValues) -> Result<String, ResolveError> {
    let pattern = parse_pattern(pattern)?;
    check_keys(&pattern, groups)?;
    render_pattern(&pattern, groups)
}

/// Substitute the body of each dynamic group with the selected pattern text.
///
/// Placeholders become named groups so that the group numbering of the
/// returned template matches the original. Selected patterns may not define
/// capture groups of their own.
///
/// # Example
///
/// ```
/// use dynser::GroupKey;
/// use dynser::interpreter::{GroupValues, resolve_dynamic};
///
/// let selected = GroupValues::from([(GroupKey::Index(1), r"\d+".to_string())]);
/// assert_eq!(resolve_dynamic("{n}-{m}", &selected).unwrap(), r"(?<n>\d+)-{m}");
/// ```
pub fn resolve_dynamic(pattern: &str, selected: &GroupValues) -> Result<String, ResolveError> {
    let mut pattern = parse_pattern(pattern)?;
    check_keys(&pattern, selected)?;

    let mut bodies = BTreeMap::new();
    for (key, text) in selected {
        let body = parse_pattern(text)?;
        if !body.groups().is_empty() {
            return Err(ResolveError::DynamicCapture {
                group: key.to_string(),
                pattern: text.clone(),
            });
        }
        bodies.insert(key.clone(), body);
    }

    substitute(&mut pattern, &bodies);
    Ok(pattern.to_string())
}

fn check_keys(pattern: &Pattern, groups: &GroupValues) -> Result<(), ResolveError> {
    match groups.keys().find(|key| !pattern.defines(key)) {
        Some(key) => Err(ResolveError::UnknownGroup {
            group: key.to_string(),
        }),
        None => Ok(()),
    }
}

/// Value for a group, by index first and then by name.
pub(crate) fn lookup<'a, T>(
    values: &'a BTreeMap<GroupKey, T>,
    index: usize,
    name: Option<&str>,
) -> Option<&'a T> {
    values
        .get(&GroupKey::Index(index))
        .or_else(|| name.and_then(|name| values.get(&GroupKey::Name(name.to_string()))))
}

fn render_pattern(pattern: &Pattern, groups: &GroupValues) -> Result<String, ResolveError> {
    let mut first_error = None;
    for branch in &pattern.branches {
        match render_sequence(branch, groups) {
            Ok(text) => return Ok(text),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(ResolveError::NotRenderable {
        construct: pattern.to_string(),
    }))
}

fn render_sequence(sequence: &Sequence, groups: &GroupValues) -> Result<String, ResolveError> {
    let mut result = String::new();
    for item in &sequence.items {
        result.push_str(&render_item(item, groups)?);
        if result.len() > MAX_RENDERED_LEN {
            return Err(ResolveError::TooLong {
                limit: MAX_RENDERED_LEN,
            });
        }
    }
    Ok(result)
}

fn render_item(item: &Item, groups: &GroupValues) -> Result<String, ResolveError> {
    let min = item.quantifier.map_or(1, |quantifier| quantifier.min);
    let count = if contains_value(&item.atom, groups) {
        1
    } else {
        min
    };
    if count == 0 {
        return Ok(String::new());
    }
    let once = render_atom(&item.atom, groups)?;
    let count = count as usize;
    match once.len().checked_mul(count) {
        Some(len) if len <= MAX_RENDERED_LEN => Ok(once.repeat(count)),
        _ => Err(ResolveError::TooLong {
            limit: MAX_RENDERED_LEN,
        }),
    }
}

fn render_atom(atom: &Atom, groups: &GroupValues) -> Result<String, ResolveError> {
    match atom {
        Atom::Literal(c) => Ok(c.to_string()),
        Atom::Anchor(_) => Ok(String::new()),
        Atom::Class(source) => Err(ResolveError::NotRenderable {
            construct: source.clone(),
        }),
        Atom::Placeholder(placeholder) => {
            lookup(groups, placeholder.index, Some(&placeholder.name))
                .cloned()
                .ok_or_else(|| ResolveError::MissingGroup {
                    group: placeholder.name.clone(),
                })
        }
        Atom::Group(group) => render_group(group, groups),
    }
}

fn render_group(group: &Group, groups: &GroupValues) -> Result<String, ResolveError> {
    let Some(index) = group.index else {
        return render_pattern(&group.body, groups);
    };
    if let Some(value) = lookup(groups, index, group.name.as_deref()) {
        return Ok(value.clone());
    }
    render_pattern(&group.body, groups).map_err(|_| ResolveError::MissingGroup {
        group: group.name.clone().unwrap_or_else(|| index.to_string()),
    })
}

fn contains_value(atom: &Atom, groups: &GroupValues) -> bool {
    match atom {
        Atom::Placeholder(placeholder) => {
            lookup(groups, placeholder.index, Some(&placeholder.name)).is_some()
        }
        Atom::Group(group) => {
            group
                .index
                .is_some_and(|index| lookup(groups, index, group.name.as_deref()).is_some())
                || group
                    .body
                    .branches
                    .iter()
                    .flat_map(|branch| &branch.items)
                    .any(|item| contains_value(&item.atom, groups))
        }
        Atom::Literal(_) | Atom::Class(_) | Atom::Anchor(_) => false,
    }
}

fn substitute(pattern: &mut Pattern, bodies: &BTreeMap<GroupKey, Pattern>) {
    for item in pattern
        .branches
        .iter_mut()
        .flat_map(|branch| branch.items.iter_mut())
    {
        match &mut item.atom {
            Atom::Group(group) => {
                let body = group
                    .index
                    .and_then(|index| lookup(bodies, index, group.name.as_deref()));
                match body {
                    Some(body) => group.body = body.clone(),
                    None => substitute(&mut group.body, bodies),
                }
            }
            Atom::Placeholder(placeholder) => {
                if let Some(body) = lookup(bodies, placeholder.index, Some(&placeholder.name)) {
                    item.atom = Atom::Group(Group {
                        index: Some(placeholder.index),
                        name: Some(placeholder.name.clone()),
                        body: body.clone(),
                    });
                }
            }
            Atom::Literal(_) | Atom::Class(_) | Atom::Anchor(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: &[(GroupKey, &str)]) -> GroupValues {
        entries
            .iter()
            .map(|(key, value)| (key.clone(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn valued_group_ignores_quantifier() {
        let groups = values(&[(GroupKey::Index(1), "42")]);
        assert_eq!(resolve(r"(\d)+", &groups).unwrap(), "42");
    }

    #[test]
    fn counted_literal_repeats() {
        assert_eq!(resolve("a{3}b", &GroupValues::new()).unwrap(), "aaab");
    }

    #[test]
    fn optional_group_renders_only_with_value() {
        assert_eq!(resolve("(?:<(x)>)?", &GroupValues::new()).unwrap(), "");
        let groups = values(&[(GroupKey::Index(1), "v")]);
        assert_eq!(resolve("(?:<(x)>)?", &groups).unwrap(), "<v>");
    }

    #[test]
    fn nested_repetition_is_bounded() {
        let err = resolve("(?:(?:(?:abcdefgh){1000}){1000}){1000}", &GroupValues::new());
        assert_eq!(
            err,
            Err(ResolveError::TooLong {
                limit: MAX_RENDERED_LEN
            })
        );
    }

    #[test]
    fn unrenderable_group_body_is_missing_group() {
        let groups = values(&[(GroupKey::Index(2), "v")]);
        let err = resolve("(?:<(.)(y)>)?", &groups).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingGroup {
                group: "1".to_string()
            }
        );
    }
}
