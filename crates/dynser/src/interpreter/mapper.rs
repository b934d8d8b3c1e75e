use crate::interpreter::Context;
use crate::types::Properties;

/// Converts between an application type and properties.
///
/// Used by [`Converter::serialize`](crate::Converter::serialize) and
/// [`Converter::deserialize`](crate::Converter::deserialize). Both directions
/// may read and update the conversion context.
pub trait Mapper<T> {
    fn to_properties(&self, context: &mut Context, target: &T) -> Properties;

    fn from_properties(&self, context: &mut Context, props: Properties) -> T;
}

/// A [`Mapper`] built from two closures.
///
/// # Example
///
/// ```
/// use dynser::{props, Context, FnMapper, Mapper, PropertyValue};
///
/// let mapper = FnMapper::new(
///     |_: &mut Context, n: &u32| props! { "n" => n.to_string() },
///     |_: &mut Context, p: dynser::Properties| -> u32 {
///         p.get("n")
///             .and_then(PropertyValue::as_string)
///             .and_then(|s| s.parse().ok())
///             .unwrap_or(0)
///     },
/// );
/// let mut context = Context::new();
/// let props = mapper.to_properties(&mut context, &7);
/// assert_eq!(mapper.from_properties(&mut context, props), 7);
/// ```
pub struct FnMapper<F, G> {
    to: F,
    from: G,
}

impl<F, G> FnMapper<F, G> {
    pub fn new(to: F, from: G) -> Self {
        Self { to, from }
    }
}

impl<T, F, G> Mapper<T> for FnMapper<F, G>
where
    F: Fn(&mut Context, &T) -> Properties,
    G: Fn(&mut Context, Properties) -> T,
{
    fn to_properties(&self, context: &mut Context, target: &T) -> Properties {
        (self.to)(context, target)
    }

    fn from_properties(&self, context: &mut Context, props: Properties) -> T {
        (self.from)(context, props)
    }
}
