//! Election cycle state, persisted in the key-value config store.
//!
//! Nothing here is cached: every tick reads the store afresh, so a restarted
//! process (or an operator editing the store) picks up exactly where the
//! last writer left off.

use std::sync::Arc;

use coop_governance::Hierarchy;
use coop_store::{keys, ConfigStore};
use coop_types::{ElectionCycleState, MessageRef, Timestamp, UserId};

use crate::NodeError;

/// Outcome of the last completed cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionResults {
    /// Anchor of the cycle these results come from.
    pub cycle: Timestamp,
    pub commander: UserId,
    pub leaders: Vec<UserId>,
}

pub struct CycleStateRepo {
    config: Arc<dyn ConfigStore>,
}

impl CycleStateRepo {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { config }
    }

    /// Current state. A missing or unreadable `last_election` reads as the
    /// epoch, which makes a cycle due immediately.
    pub fn load(&self) -> Result<ElectionCycleState, NodeError> {
        let is_on = self.config.get(keys::ELECTION_ON)?.as_deref() == Some("true");
        let last_started_at = match self.config.get(keys::LAST_ELECTION)? {
            None => Timestamp::EPOCH,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unreadable last_election, treating as epoch");
                Timestamp::EPOCH
            }),
        };
        Ok(ElectionCycleState::new(is_on, last_started_at))
    }

    /// Persist `state`. The anchor is written before the flag so a crash in
    /// between leaves an anchored but not-yet-running cycle, which the next
    /// tick starts without re-anchoring.
    pub fn save(&self, state: &ElectionCycleState) -> Result<(), NodeError> {
        self.config.set(
            keys::LAST_ELECTION,
            &state.last_started_at.as_secs().to_string(),
        )?;
        self.config
            .set(keys::ELECTION_ON, if state.is_on { "true" } else { "false" })?;
        Ok(())
    }

    pub fn status_surface(&self) -> Result<Option<MessageRef>, NodeError> {
        match self.config.get(keys::ELECTION_MESSAGE_LINK)? {
            None => Ok(None),
            Some(link) => MessageRef::parse_link(&link)
                .map(Some)
                .map_err(|e| NodeError::Config(e.to_string())),
        }
    }

    pub fn set_status_surface(&self, surface: MessageRef) -> Result<(), NodeError> {
        self.config
            .set(keys::ELECTION_MESSAGE_LINK, &surface.to_string())?;
        Ok(())
    }

    /// Remember `hierarchy` as the outcome of the cycle anchored at `cycle`.
    /// The cycle is written last, so a partial write never carries the
    /// current cycle's tag.
    pub fn record_results(
        &self,
        hierarchy: &Hierarchy,
        cycle: Timestamp,
    ) -> Result<(), NodeError> {
        self.config.set(
            keys::LAST_COMMANDER,
            &hierarchy.commander.candidate_id.to_string(),
        )?;
        let leaders: Vec<String> = hierarchy
            .leaders
            .iter()
            .map(|l| l.candidate_id.to_string())
            .collect();
        self.config.set(keys::LAST_LEADERS, &leaders.join(","))?;
        self.config
            .set(keys::LAST_RESULTS_CYCLE, &cycle.as_secs().to_string())?;
        Ok(())
    }

    /// Forget the remembered results.
    pub fn clear_results(&self) -> Result<(), NodeError> {
        self.config.delete(keys::LAST_RESULTS_CYCLE)?;
        self.config.delete(keys::LAST_COMMANDER)?;
        self.config.delete(keys::LAST_LEADERS)?;
        Ok(())
    }

    /// Results of the last completed cycle, if any cycle ever completed with
    /// a candidate standing.
    pub fn last_results(&self) -> Result<Option<ElectionResults>, NodeError> {
        let Some(commander) = self.config.get(keys::LAST_COMMANDER)? else {
            return Ok(None);
        };
        let commander = commander
            .parse()
            .map_err(|e: coop_types::TypesError| NodeError::Config(e.to_string()))?;
        let leaders = self
            .config
            .get(keys::LAST_LEADERS)?
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<UserId>, _>>()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        let cycle = match self.config.get(keys::LAST_RESULTS_CYCLE)? {
            Some(raw) => raw
                .parse()
                .map_err(|e: coop_types::TypesError| NodeError::Config(e.to_string()))?,
            None => Timestamp::EPOCH,
        };
        Ok(Some(ElectionResults {
            cycle,
            commander,
            leaders,
        }))
    }

    /// Forget the running cycle. The status surface link survives when
    /// `keep_status_surface` is set.
    pub fn reset(&self, keep_status_surface: bool) -> Result<(), NodeError> {
        self.config.delete(keys::ELECTION_ON)?;
        self.config.delete(keys::LAST_ELECTION)?;
        if !keep_status_surface {
            self.config.delete(keys::ELECTION_MESSAGE_LINK)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_governance::{RankedEntry, TallyEntry};
    use coop_nullables::NullConfigStore;
    use coop_types::{ChannelId, MessageId};

    fn repo() -> (Arc<NullConfigStore>, CycleStateRepo) {
        let store = Arc::new(NullConfigStore::new());
        let repo = CycleStateRepo::new(store.clone());
        (store, repo)
    }

    #[test]
    fn fresh_store_reads_as_off_at_epoch() {
        let (_, repo) = repo();
        assert_eq!(repo.load().unwrap(), ElectionCycleState::default());
        assert_eq!(repo.status_surface().unwrap(), None);
        assert_eq!(repo.last_results().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let (store, repo) = repo();
        let state = ElectionCycleState::new(true, Timestamp::new(1_700_000_000));
        repo.save(&state).unwrap();
        assert_eq!(repo.load().unwrap(), state);
        assert_eq!(
            store.get(keys::LAST_ELECTION).unwrap().as_deref(),
            Some("1700000000")
        );
        assert_eq!(store.get(keys::ELECTION_ON).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn garbage_anchor_reads_as_epoch() {
        let (store, repo) = repo();
        store.set(keys::LAST_ELECTION, "soon").unwrap();
        store.set(keys::ELECTION_ON, "yes").unwrap();
        assert_eq!(repo.load().unwrap(), ElectionCycleState::default());
    }

    #[test]
    fn status_surface_accepts_full_links() {
        let (store, repo) = repo();
        store
            .set(
                keys::ELECTION_MESSAGE_LINK,
                "https://discord.com/channels/1/22/333",
            )
            .unwrap();
        assert_eq!(
            repo.status_surface().unwrap(),
            Some(MessageRef::new(ChannelId::new(22), MessageId::new(333)))
        );
        store.set(keys::ELECTION_MESSAGE_LINK, "nonsense").unwrap();
        assert!(matches!(repo.status_surface(), Err(NodeError::Config(_))));
    }

    #[test]
    fn results_round_trip() {
        let (_, repo) = repo();
        let hierarchy = Hierarchy::rank(
            &[
                TallyEntry {
                    candidate_id: UserId::new(1),
                    votes: 3,
                },
                TallyEntry {
                    candidate_id: UserId::new(2),
                    votes: 9,
                },
            ],
            400,
            250,
        )
        .unwrap();
        assert_eq!(
            hierarchy.commander,
            RankedEntry {
                rank: 0,
                candidate_id: UserId::new(2),
                votes: 9
            }
        );
        repo.record_results(&hierarchy, Timestamp::new(77)).unwrap();
        assert_eq!(
            repo.last_results().unwrap(),
            Some(ElectionResults {
                cycle: Timestamp::new(77),
                commander: UserId::new(2),
                leaders: vec![UserId::new(1)],
            })
        );
        repo.clear_results().unwrap();
        assert_eq!(repo.last_results().unwrap(), None);
    }

    #[test]
    fn reset_can_keep_status_surface() {
        let (_, repo) = repo();
        let surface = MessageRef::new(ChannelId::new(1), MessageId::new(2));
        repo.set_status_surface(surface).unwrap();
        repo.save(&ElectionCycleState::new(true, Timestamp::new(5)))
            .unwrap();
        repo.reset(true).unwrap();
        assert_eq!(repo.load().unwrap(), ElectionCycleState::default());
        assert_eq!(repo.status_surface().unwrap(), Some(surface));
        repo.reset(false).unwrap();
        assert_eq!(repo.status_surface().unwrap(), None);
    }
}
