//! Parsing and wire encoding of [`crate::types::Cell`] values.

pub mod bool;
pub mod numeric;
pub mod sql;
pub mod temporal;
