use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A property set: the unit of input and output for a tag conversion.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Flat string view of properties, used to fill template groups.
pub type Fields = BTreeMap<String, String>;

/// A property value passed to or recovered from a conversion.
///
/// Values are strings, ordered lists of values, or nested maps. List-valued
/// properties drive repetition: a list of length `n` contributes one element
/// to each of `n` index-aligned slices.
///
/// # Example
///
/// ```
/// use dynser::{PropertyValue, props};
///
/// let value: PropertyValue = vec!["1", "2"].into();
/// assert_eq!(value.as_list().map(Vec::len), Some(2));
///
/// let nested: PropertyValue = props! { "a" => "1" }.into();
/// assert!(nested.is_map());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A scalar string value.
    String(String),

    /// An ordered list of values.
    List(Vec<PropertyValue>),

    /// A nested property set.
    Map(Properties),
}

impl PropertyValue {
    pub fn is_string(&self) -> bool {
        matches!(self, PropertyValue::String(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PropertyValue::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, PropertyValue::Map(_))
    }

    /// Get this value as a string, if it is one.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a list, if it is one.
    pub fn as_list(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a nested property set, if it is one.
    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(map) => {
                write!(f, "{{")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<Properties> for PropertyValue {
    fn from(map: Properties) -> Self {
        PropertyValue::Map(map)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        PropertyValue::List(items.into_iter().map(Into::into).collect())
    }
}
