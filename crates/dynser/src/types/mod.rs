mod group_key;
mod properties;
mod value;

pub use group_key::GroupKey;
pub use properties::{
    ListSlices, PREFIX_SEPARATOR, add_prefix, overlay, remove_prefix, split_lists, string_fields,
};
pub use value::{Fields, Properties, PropertyValue};
