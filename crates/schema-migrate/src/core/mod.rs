//! Shared building blocks.
//!
//! - [`identifier`]: identifier validation and quoting rules
//! - [`value`]: literal values and their conversions

pub mod identifier;
pub mod value;

pub use value::Value;
