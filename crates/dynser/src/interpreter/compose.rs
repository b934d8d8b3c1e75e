use std::collections::BTreeMap;

/// Compose two mappings: `k -> v` and `v -> w` into `k -> w`.
///
/// Fails with the first `v` (in `lhs` key order) that has no entry in `rhs`.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use dynser::interpreter::compose;
///
/// let groups = BTreeMap::from([(1, "x"), (2, "y")]);
/// let fields = BTreeMap::from([("x", "3"), ("y", "4")]);
/// assert_eq!(compose(&groups, &fields), Ok(BTreeMap::from([(1, "3"), (2, "4")])));
/// ```
pub fn compose<K, V, W>(lhs: &BTreeMap<K, V>, rhs: &BTreeMap<V, W>) -> Result<BTreeMap<K, W>, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
    W: Clone,
{
    lhs.iter()
        .map(|(key, via)| match rhs.get(via) {
            Some(value) => Ok((key.clone(), value.clone())),
            None => Err(via.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lhs_composes_to_empty() {
        let lhs: BTreeMap<u8, &str> = BTreeMap::new();
        let rhs = BTreeMap::from([("a", 1)]);
        assert_eq!(compose(&lhs, &rhs), Ok(BTreeMap::new()));
    }

    #[test]
    fn unused_rhs_entries_are_ignored() {
        let lhs = BTreeMap::from([(1, "a")]);
        let rhs = BTreeMap::from([("a", "x"), ("b", "y")]);
        assert_eq!(compose(&lhs, &rhs), Ok(BTreeMap::from([(1, "x")])));
    }

    #[test]
    fn first_missing_value_is_reported() {
        let lhs = BTreeMap::from([(1, "a"), (2, "missing"), (3, "also_missing")]);
        let rhs = BTreeMap::from([("a", "x")]);
        assert_eq!(compose(&lhs, &rhs), Err("missing"));
    }

    #[test]
    fn shared_values_map_to_the_same_result() {
        let lhs = BTreeMap::from([(1, "a"), (2, "a")]);
        let rhs = BTreeMap::from([("a", "x")]);
        assert_eq!(compose(&lhs, &rhs), Ok(BTreeMap::from([(1, "x"), (2, "x")])));
    }
}
