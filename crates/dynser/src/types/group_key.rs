use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key of a capture group in a pattern: a 1-based index or a group name.
///
/// Schema files write indices as integers and names as strings; a string made
/// only of digits is read as an index.
///
/// # Example
///
/// ```
/// use dynser::GroupKey;
///
/// assert_eq!("2".parse::<GroupKey>().unwrap(), GroupKey::Index(2));
/// assert_eq!("x".parse::<GroupKey>().unwrap(), GroupKey::Name("x".to_string()));
/// assert_eq!(GroupKey::from(1).to_string(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Group number, counted from 1 in order of opening position.
    Index(usize),
    /// Group name, from `(?<name>...)` or a `{name}` placeholder.
    Name(String),
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GroupKey::Index(index) => write!(f, "{index}"),
            GroupKey::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<usize> for GroupKey {
    fn from(index: usize) -> Self {
        GroupKey::Index(index)
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Name(name.to_string())
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("group key cannot be empty".to_string());
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<usize>()
                .map(GroupKey::Index)
                .map_err(|e| format!("invalid group index '{s}': {e}"));
        }
        Ok(GroupKey::Name(s.to_string()))
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupKey::Index(index) => serializer.serialize_u64(*index as u64),
            GroupKey::Name(name) => serializer.serialize_str(name),
        }
    }
}

struct GroupKeyVisitor;

impl Visitor<'_> for GroupKeyVisitor {
    type Value = GroupKey;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "a group index or a group name")
    }

    fn visit_u64<E: DeError>(self, v: u64) -> Result<GroupKey, E> {
        usize::try_from(v)
            .map(GroupKey::Index)
            .map_err(|_| E::custom(format!("group index {v} is too large")))
    }

    fn visit_i64<E: DeError>(self, v: i64) -> Result<GroupKey, E> {
        usize::try_from(v)
            .map(GroupKey::Index)
            .map_err(|_| E::custom(format!("group index {v} must not be negative")))
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<GroupKey, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for GroupKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(GroupKeyVisitor)
    }
}
