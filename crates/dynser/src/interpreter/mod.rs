//! Conversion engine.
//!
//! This module turns property sets into strings with a tag's rule tree, and
//! matches strings back into property sets. [`Converter`] is the entry point;
//! the building blocks (mapping composition, template filling, repetition
//! counting and the script host) are public for callers that need them
//! directly.

mod compose;
mod context;
mod converter;
mod deserialize;
mod error;
mod mapper;
mod repetition;
mod resolve;
mod script;
mod serialize;

pub use compose::compose;
pub use context::Context;
pub use converter::Converter;
pub use error::{
    DeserializeError, DeserializeErrorKind, ErrorRef, ResolveError, SerializeError,
    SerializeErrorKind, compute_suggestions,
};
pub use mapper::{FnMapper, Mapper};
pub use repetition::{RepetitionLength, max_repetition};
pub use resolve::{GroupValues, resolve, resolve_dynamic};
pub use script::{RhaiScriptHost, ScriptFailure, ScriptHost, keywords};
