//! Two-sided sacrifice ballot resolution.
//!
//! A sacrifice ballot collects condemn and protect reactions. Each incoming
//! reaction re-evaluates the ballot from the surface's current counts; there is
//! no stored tally.

use serde::{Deserialize, Serialize};

use crate::quorum::required_votes;
use crate::GovernanceParams;

/// Which side a reaction voted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallotSide {
    Condemn,
    Protect,
}

/// Current votes on a ballot surface, excluding the engine's own seed reactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SacrificeCounts {
    pub condemn: u64,
    pub protect: u64,
}

/// Votes each side needs, computed independently from the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SacrificeThresholds {
    pub condemn: u64,
    pub protect: u64,
}

impl SacrificeThresholds {
    pub fn for_population(population: u64, params: &GovernanceParams) -> Self {
        Self {
            condemn: required_votes(population, params.condemn_fraction_bps),
            protect: required_votes(population, params.protect_fraction_bps),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SacrificeOutcome {
    Condemned,
    Protected,
    Pending {
        remaining_protect: u64,
        remaining_condemn: u64,
    },
}

impl SacrificeOutcome {
    /// Resolve a ballot. Condemnation wins as soon as its threshold is met;
    /// protection only resolves on the protect reaction that reaches it.
    pub fn resolve(
        counts: SacrificeCounts,
        thresholds: SacrificeThresholds,
        trigger: BallotSide,
    ) -> Self {
        let remaining_protect = thresholds.protect.saturating_sub(counts.protect);
        let remaining_condemn = thresholds.condemn.saturating_sub(counts.condemn);

        if remaining_condemn == 0 {
            Self::Condemned
        } else if remaining_protect == 0 && trigger == BallotSide::Protect {
            Self::Protected
        } else {
            Self::Pending {
                remaining_protect,
                remaining_condemn,
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: SacrificeThresholds = SacrificeThresholds {
        condemn: 10,
        protect: 8,
    };

    #[test]
    fn protect_reached_on_protect_reaction() {
        let counts = SacrificeCounts {
            condemn: 3,
            protect: 8,
        };
        assert_eq!(
            SacrificeOutcome::resolve(counts, THRESHOLDS, BallotSide::Protect),
            SacrificeOutcome::Protected
        );
    }

    #[test]
    fn protect_reached_but_condemn_reaction_stays_pending() {
        let counts = SacrificeCounts {
            condemn: 3,
            protect: 8,
        };
        assert_eq!(
            SacrificeOutcome::resolve(counts, THRESHOLDS, BallotSide::Condemn),
            SacrificeOutcome::Pending {
                remaining_protect: 0,
                remaining_condemn: 7
            }
        );
    }

    #[test]
    fn condemn_wins_regardless_of_protect() {
        let counts = SacrificeCounts {
            condemn: 10,
            protect: 50,
        };
        for trigger in [BallotSide::Condemn, BallotSide::Protect] {
            assert_eq!(
                SacrificeOutcome::resolve(counts, THRESHOLDS, trigger),
                SacrificeOutcome::Condemned
            );
        }
    }

    #[test]
    fn pending_reports_both_remainders() {
        let counts = SacrificeCounts {
            condemn: 4,
            protect: 1,
        };
        let outcome = SacrificeOutcome::resolve(counts, THRESHOLDS, BallotSide::Condemn);
        assert_eq!(
            outcome,
            SacrificeOutcome::Pending {
                remaining_protect: 7,
                remaining_condemn: 6
            }
        );
        assert!(!outcome.is_resolved());
    }

    #[test]
    fn thresholds_from_population() {
        let t = SacrificeThresholds::for_population(400, &GovernanceParams::default());
        assert_eq!(t.condemn, 10);
        assert_eq!(t.protect, 8);
    }
}
