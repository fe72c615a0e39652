//! Value codec for timelens
//!
//! Values crossing the transport boundary are richer than JSON: they may hold
//! `undefined`, non-finite numbers, dates, regular expressions, maps, sets and
//! functions. This crate models them as [`InspectValue`] and encodes them to
//! JSON text using sentinel strings and `_custom` envelopes, then revives them
//! on the other side.

pub mod error;
pub mod value;
pub mod wire;

pub use error::{CodecError, Result};
pub use value::InspectValue;
pub use wire::{parse, revive, stringify, stringify_json};
