pub mod config;
pub mod interpreter;
pub mod parser;
pub mod types;

pub use config::{Config, ConfigIssue, LoadError, Tag};
pub use interpreter::{
    Context, Converter, DeserializeError, DeserializeErrorKind, ErrorRef, FnMapper, Mapper,
    ResolveError, RhaiScriptHost, ScriptHost, SerializeError, SerializeErrorKind,
    compute_suggestions,
};
pub use types::{Fields, GroupKey, Properties, PropertyValue};

/// Creates a `BTreeMap<String, PropertyValue>` from key-value pairs.
///
/// Values are converted via `Into<PropertyValue>`, so strings, vectors and
/// nested property maps can be passed directly.
///
/// # Example
///
/// ```
/// use dynser::{props, PropertyValue};
///
/// let p = props! { "x" => "3", "ys" => vec!["1", "2"] };
/// assert_eq!(p.len(), 2);
/// assert_eq!(p["x"].as_string(), Some("3"));
/// assert!(p["ys"].is_list());
/// ```
#[macro_export]
macro_rules! props {
    {} => {
        ::std::collections::BTreeMap::<String, $crate::PropertyValue>::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::BTreeMap::<String, $crate::PropertyValue>::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::PropertyValue>::into($value));
            )+
            map
        }
    };
}
