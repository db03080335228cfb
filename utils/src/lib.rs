//! Shared utilities for the Coop governance engine.

pub mod time;

pub use time::{format_calendar, format_duration, humanize_secs};
