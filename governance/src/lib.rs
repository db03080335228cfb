//! Governance rules for the Coop community.
//!
//! Two flows share the same population-relative quorum math:
//! - **Elections** run on a fixed cadence: a voting window of `duration_secs`
//!   opens every `interval_secs`; the ranked tally yields one commander and a
//!   quorum-sized set of leaders.
//! - **Sacrifice ballots** are ad hoc two-sided ballots (condemn / protect)
//!   resolved as soon as either side reaches its own threshold.
//!
//! Everything here is pure: no I/O, no clocks. The node crate feeds in the
//! current time, persisted state and live reaction counts.

pub mod error;
pub mod hierarchy;
pub mod params;
pub mod quorum;
pub mod sacrifice;
pub mod window;

pub use error::GovernanceError;
pub use hierarchy::{Hierarchy, RankedEntry, TallyEntry};
pub use params::GovernanceParams;
pub use quorum::{required_votes, BPS_SCALE};
pub use sacrifice::{BallotSide, SacrificeCounts, SacrificeOutcome, SacrificeThresholds};
pub use window::{decide, CycleAction, CycleWindow};
