//! Nullable infrastructure for deterministic testing.
//!
//! All external collaborators (clock, messaging platform, storage) are
//! abstracted behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod platform;
pub mod store;

pub use clock::NullClock;
pub use platform::NullPlatform;
pub use store::{NullBallotStore, NullConfigStore};
