//! Ranking candidates into the community hierarchy.

use coop_types::UserId;
use serde::{Deserialize, Serialize};

use crate::quorum::required_votes;

/// One candidate's live vote count, in candidate registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub candidate_id: UserId,
    pub votes: u64,
}

/// A ranked candidate. `rank` 0 is the commander.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub candidate_id: UserId,
    pub votes: u64,
}

/// Commander plus leaders derived from a tally. Never persisted; recomputed
/// on every progress check and authoritative only when a cycle ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub commander: RankedEntry,
    pub leaders: Vec<RankedEntry>,
}

impl Hierarchy {
    /// Rank `entries` (given in registration order) by votes, descending.
    ///
    /// The sort is stable, so equal counts keep registration order. Leaders
    /// are ranks `[1, required_votes(population, leader_fraction_bps))`.
    /// Returns `None` when nobody stood.
    pub fn rank(entries: &[TallyEntry], population: u64, leader_fraction_bps: u32) -> Option<Self> {
        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| b.votes.cmp(&a.votes));

        let mut ranked = sorted
            .into_iter()
            .enumerate()
            .map(|(rank, entry)| RankedEntry {
                rank,
                candidate_id: entry.candidate_id,
                votes: entry.votes,
            });

        let commander = ranked.next()?;
        let leader_end = required_votes(population, leader_fraction_bps);
        let leaders = ranked
            .take_while(|entry| (entry.rank as u64) < leader_end)
            .collect();

        Some(Self { commander, leaders })
    }

    /// Commander followed by leaders.
    pub fn members(&self) -> impl Iterator<Item = &RankedEntry> {
        std::iter::once(&self.commander).chain(self.leaders.iter())
    }
}
