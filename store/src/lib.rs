//! Abstract storage traits for the Coop governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod ballot;
pub mod config;
pub mod error;

pub use ballot::BallotStore;
pub use config::{keys, ConfigStore};
pub use error::StoreError;
