//! Request model
//!
//! The item grammar for positional arguments, method classification, and the
//! immutable template every attempt of a run is built from.

pub mod items;
pub mod method;
pub mod template;

pub use items::InputItem;
pub use template::{BodySource, RequestTemplate};
