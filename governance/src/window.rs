//! Cycle window derivation and the reconciler's decision table.
//!
//! The desired state is a pure function of the wall clock and the persisted
//! cycle anchor. [`decide`] compares it with the persisted `is_on` flag and
//! picks the single action that converges the two. Running it again after the
//! action has been applied yields the steady-state action (Commentate or Idle),
//! never a second transition.

use coop_types::{ElectionCycleState, Timestamp};
use serde::{Deserialize, Serialize};

use crate::GovernanceParams;

/// The voting window anchored at the last cycle start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleWindow {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    /// When the following cycle becomes due.
    pub next_start: Timestamp,
}

impl CycleWindow {
    pub fn anchored(last_started_at: Timestamp, params: &GovernanceParams) -> Self {
        Self {
            starts_at: last_started_at,
            ends_at: last_started_at.saturating_add(params.duration_secs),
            next_start: last_started_at.saturating_add(params.interval_secs),
        }
    }

    /// `starts_at <= now <= ends_at`.
    pub fn contains(&self, now: Timestamp) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }

    /// The anchored window is over and the next cycle's start has been reached.
    pub fn is_due(&self, now: Timestamp) -> bool {
        !self.contains(now) && now >= self.next_start
    }

    /// Whether voting should be open, given whether a cycle is running.
    ///
    /// A running cycle only ever votes inside its own anchored window; an idle
    /// engine also treats a due cycle as open so the next tick starts it.
    pub fn in_voting_window(&self, now: Timestamp, is_on: bool) -> bool {
        self.contains(now) || (!is_on && self.is_due(now))
    }

    /// Seconds of voting left, zero outside the window.
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        if self.contains(now) {
            self.ends_at.as_secs() - now.as_secs()
        } else {
            0
        }
    }
}

/// What one reconciler tick should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleAction {
    /// Open a cycle. `anchor` is the new `last_started_at` when the cycle is
    /// newly due; `None` keeps the existing anchor (already inside its window).
    Start { anchor: Option<Timestamp> },
    /// Close the running cycle: final tally, results, clear ballots.
    End,
    /// Cycle running inside its window: publish progress.
    Commentate,
    /// Nothing running and nothing due.
    Idle,
}

impl CycleAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::End => "end",
            Self::Commentate => "commentate",
            Self::Idle => "idle",
        }
    }

    /// The persisted state once this action has been applied.
    pub fn next_state(&self, state: ElectionCycleState) -> ElectionCycleState {
        match self {
            Self::Start { anchor } => ElectionCycleState {
                is_on: true,
                last_started_at: anchor.unwrap_or(state.last_started_at),
            },
            Self::End => ElectionCycleState {
                is_on: false,
                ..state
            },
            Self::Commentate | Self::Idle => state,
        }
    }
}

/// Pick the action converging `state` towards the desired state at `now`.
pub fn decide(
    now: Timestamp,
    state: &ElectionCycleState,
    params: &GovernanceParams,
) -> CycleAction {
    let window = CycleWindow::anchored(state.last_started_at, params);
    let in_window = window.in_voting_window(now, state.is_on);

    match (in_window, state.is_on) {
        (true, false) if window.contains(now) => CycleAction::Start { anchor: None },
        (true, false) => CycleAction::Start { anchor: Some(now) },
        (false, true) => CycleAction::End,
        (true, true) => CycleAction::Commentate,
        (false, false) => CycleAction::Idle,
    }
}
