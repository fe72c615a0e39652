//! Shared utilities for timelens crates
//!
//! Holds the pieces every other crate leans on: logging setup, the
//! validation trait used by configuration types, and path helpers for
//! reading and writing nested `serde_json::Value` trees.

pub mod logging;
pub mod validation;
pub mod value_path;

pub use logging::{init_logging, LogLevel};
pub use validation::{Validatable, ValidationError};
pub use value_path::{PathError, PathSegment, ValuePath};
