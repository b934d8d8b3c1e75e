//! Operations over property sets: list slicing, field extraction and key prefixes.

use super::{Fields, Properties, PropertyValue};

/// Separator between a key prefix and the rest of the key (`point.x`).
pub const PREFIX_SEPARATOR: char = '.';

/// A property set split into its non-list part and per-index list slices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSlices {
    /// Every entry whose value is not a list.
    pub residual: Properties,
    /// Slice `i` holds element `i` of every list long enough to have one.
    pub slices: Vec<Properties>,
}

/// Split `props` into non-list entries and index-aligned list slices.
///
/// An entry `k: [v0, v1, v2]` contributes `k: v0` to slice 0, `k: v1` to
/// slice 1 and `k: v2` to slice 2. The number of slices is the length of the
/// longest list; shorter lists simply do not appear in the later slices.
///
/// # Example
///
/// ```
/// use dynser::props;
/// use dynser::types::split_lists;
///
/// let split = split_lists(&props! { "a" => "0", "b" => vec!["1", "2"] });
/// assert_eq!(split.residual, props! { "a" => "0" });
/// assert_eq!(split.slices, vec![props! { "b" => "1" }, props! { "b" => "2" }]);
/// ```
pub fn split_lists(props: &Properties) -> ListSlices {
    let mut split = ListSlices::default();
    for (key, value) in props {
        match value {
            PropertyValue::List(items) => {
                if split.slices.len() < items.len() {
                    split.slices.resize_with(items.len(), Properties::new);
                }
                for (slice, item) in split.slices.iter_mut().zip(items) {
                    slice.insert(key.clone(), item.clone());
                }
            }
            other => {
                split.residual.insert(key.clone(), other.clone());
            }
        }
    }
    split
}

/// Keep only the string-valued entries of `props`.
pub fn string_fields(props: &Properties) -> Fields {
    props
        .iter()
        .filter_map(|(key, value)| value.as_string().map(|s| (key.clone(), s.to_string())))
        .collect()
}

/// The entries whose key carries `prefix.`, with the prefix stripped.
///
/// Keys without the prefix are dropped, so a nested view only sees what was
/// addressed to it.
pub fn remove_prefix(props: &Properties, prefix: &str) -> Properties {
    props
        .iter()
        .filter_map(|(key, value)| {
            strip_key(key, prefix).map(|rest| (rest.to_string(), value.clone()))
        })
        .collect()
}

/// Prepend `prefix.` to every key.
pub fn add_prefix(props: Properties, prefix: &str) -> Properties {
    props
        .into_iter()
        .map(|(key, value)| (format!("{prefix}{PREFIX_SEPARATOR}{key}"), value))
        .collect()
}

/// Entries of `top` laid over `base`; `top` wins on equal keys.
pub fn overlay(top: Properties, base: &Properties) -> Properties {
    let mut result = base.clone();
    result.extend(top);
    result
}

fn strip_key<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    key.strip_prefix(prefix)?
        .strip_prefix(PREFIX_SEPARATOR)
        .filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn split_pads_to_longest_list() {
        let split = split_lists(&props! {
            "short" => vec!["a"],
            "long" => vec!["x", "y", "z"],
        });
        assert!(split.residual.is_empty());
        assert_eq!(split.slices.len(), 3);
        assert_eq!(split.slices[0], props! { "short" => "a", "long" => "x" });
        assert_eq!(split.slices[2], props! { "long" => "z" });
    }

    #[test]
    fn split_keeps_maps_in_residual() {
        let split = split_lists(&props! { "m" => props! { "k" => "v" } });
        assert_eq!(split.residual.len(), 1);
        assert!(split.slices.is_empty());
    }

    #[test]
    fn string_fields_drops_lists_and_maps() {
        let fields = string_fields(&props! {
            "s" => "1",
            "l" => vec!["2"],
            "m" => props! {},
        });
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["s"], "1");
    }

    #[test]
    fn remove_prefix_keeps_only_prefixed_keys() {
        let result = remove_prefix(
            &props! { "x" => "outer", "p.x" => "inner", "p.y" => "2", "px" => "3", "p." => "4" },
            "p",
        );
        assert_eq!(result, props! { "x" => "inner", "y" => "2" });
    }

    #[test]
    fn add_prefix_round_trips_with_remove_prefix() {
        let prefixed = add_prefix(props! { "a" => "1" }, "tag");
        assert_eq!(prefixed, props! { "tag.a" => "1" });
        assert_eq!(remove_prefix(&prefixed, "tag"), props! { "a" => "1" });
    }

    #[test]
    fn overlay_prefers_top() {
        let result = overlay(props! { "a" => "top" }, &props! { "a" => "base", "b" => "2" });
        assert_eq!(result, props! { "a" => "top", "b" => "2" });
    }
}
