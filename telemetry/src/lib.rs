//! Tracing setup shared by the loader binaries and tests.

pub mod tracing;
