//! Shared configuration types for the warehouse loader.

mod base;
mod connection;
mod loader;
mod object_store;
mod runner;
mod secret;

pub use base::ValidationError;
pub use connection::*;
pub use loader::LoaderConfig;
pub use object_store::ObjectStoreConfig;
pub use runner::{LoadRunnerConfig, WarehouseSecretSource};
pub use secret::{SecretError, WarehouseSecret};
