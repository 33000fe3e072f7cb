//! Test doubles for the warehouse and helpers to seed an in-memory artifact store.

pub mod artifact;
pub mod client;
