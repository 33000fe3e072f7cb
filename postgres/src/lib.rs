//! Warehouse catalog and dimensional model definitions.
//!
//! Contains the column type contract read from `information_schema` and the fixed set of
//! dimension and fact tables the loader creates and populates.

pub mod model;
pub mod schema;
