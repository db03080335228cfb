//! LMDB storage backend for the Coop governance engine.
//!
//! Implements the storage traits from `coop-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more named databases within a single environment.

pub mod ballot;
pub mod config;
pub mod environment;
pub mod error;

pub use ballot::LmdbBallotStore;
pub use config::LmdbConfigStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
