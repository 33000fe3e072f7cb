//! Configuration loading and shared configuration types for the warehouse loader.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
