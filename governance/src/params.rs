//! Tunable governance parameters.

use serde::{Deserialize, Serialize};

use crate::quorum::BPS_SCALE;
use crate::GovernanceError;

/// Election cadence and quorum fractions.
///
/// Fractions are in basis points of the current guild population
/// (250 = 2.5%).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Time between two cycle starts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Length of the voting window of one cycle.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Ranks `[1, required_votes(population, leader_fraction_bps))` become leaders.
    #[serde(default = "default_leader_fraction_bps")]
    pub leader_fraction_bps: u32,

    /// Condemn votes needed to resolve a sacrifice ballot as condemned.
    #[serde(default = "default_condemn_fraction_bps")]
    pub condemn_fraction_bps: u32,

    /// Protect votes needed to resolve a sacrifice ballot as protected.
    #[serde(default = "default_protect_fraction_bps")]
    pub protect_fraction_bps: u32,
}

fn default_interval_secs() -> u64 {
    3600 * 24 * 25
}

fn default_duration_secs() -> u64 {
    3600 * 24 * 7
}

fn default_leader_fraction_bps() -> u32 {
    250
}

fn default_condemn_fraction_bps() -> u32 {
    250
}

fn default_protect_fraction_bps() -> u32 {
    200
}

impl GovernanceParams {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.duration_secs == 0 {
            return Err(GovernanceError::EmptyVotingWindow);
        }
        if self.interval_secs <= self.duration_secs {
            return Err(GovernanceError::IntervalNotLongerThanDuration {
                interval_secs: self.interval_secs,
                duration_secs: self.duration_secs,
            });
        }
        for (name, bps) in [
            ("leader_fraction_bps", self.leader_fraction_bps),
            ("condemn_fraction_bps", self.condemn_fraction_bps),
            ("protect_fraction_bps", self.protect_fraction_bps),
        ] {
            if bps == 0 || bps >= BPS_SCALE {
                return Err(GovernanceError::FractionOutOfRange { name, bps });
            }
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            duration_secs: default_duration_secs(),
            leader_fraction_bps: default_leader_fraction_bps(),
            condemn_fraction_bps: default_condemn_fraction_bps(),
            protect_fraction_bps: default_protect_fraction_bps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(GovernanceParams::default().validate(), Ok(()));
    }

    #[test]
    fn interval_must_exceed_duration() {
        let params = GovernanceParams {
            interval_secs: 100,
            duration_secs: 100,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(GovernanceError::IntervalNotLongerThanDuration { .. })
        ));
    }

    #[test]
    fn zero_duration_rejected() {
        let params = GovernanceParams {
            duration_secs: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(GovernanceError::EmptyVotingWindow));
    }

    #[test]
    fn fractions_must_be_proper() {
        let params = GovernanceParams {
            protect_fraction_bps: 0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(GovernanceError::FractionOutOfRange {
                name: "protect_fraction_bps",
                bps: 0
            })
        );

        let params = GovernanceParams {
            leader_fraction_bps: 10_000,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
