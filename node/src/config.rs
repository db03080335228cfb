//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use coop_governance::GovernanceParams;
use coop_types::{ChannelId, GuildId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for the governance engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The community guild.
    #[serde(default = "unset_guild")]
    pub guild_id: GuildId,

    /// Channel holding the status surface and the campaign messages.
    #[serde(default = "unset_channel")]
    pub election_channel: ChannelId,

    /// Channel holding sacrifice ballots.
    #[serde(default = "unset_channel")]
    pub sacrifice_channel: ChannelId,

    /// Channel receiving announcements and acknowledgements.
    #[serde(default = "unset_channel")]
    pub feed_channel: ChannelId,

    #[serde(default = "default_vote_emoji")]
    pub vote_emoji: String,

    #[serde(default = "default_condemn_emoji")]
    pub condemn_emoji: String,

    #[serde(default = "default_protect_emoji")]
    pub protect_emoji: String,

    /// Seconds between two reconciler ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Minimum gap between two paced platform calls, in milliseconds.
    #[serde(default = "default_fetch_gap_ms")]
    pub fetch_gap_ms: u64,

    /// Idle status refresh threshold.
    #[serde(default = "default_idle_refresh_secs")]
    pub idle_refresh_secs: u64,

    /// Lifetime of self-destructing messages.
    #[serde(default = "default_transient_ttl_secs")]
    pub transient_ttl_secs: u64,

    /// How many resolved sacrifice ballots are remembered.
    #[serde(default = "default_resolved_ballot_capacity")]
    pub resolved_ballot_capacity: usize,

    /// Actually remove condemned members from the guild.
    #[serde(default)]
    pub enforce_sacrifice: bool,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Election cadence and quorum fractions (`[governance]` table).
    #[serde(default)]
    pub governance: GovernanceParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn unset_guild() -> GuildId {
    GuildId::new(0)
}

fn unset_channel() -> ChannelId {
    ChannelId::new(0)
}

fn default_vote_emoji() -> String {
    "👑".to_string()
}

fn default_condemn_emoji() -> String {
    "🗡️".to_string()
}

fn default_protect_emoji() -> String {
    "🛡️".to_string()
}

fn default_tick_secs() -> u64 {
    60
}

fn default_fetch_gap_ms() -> u64 {
    666
}

fn default_idle_refresh_secs() -> u64 {
    8 * 3600
}

fn default_transient_ttl_secs() -> u64 {
    3
}

fn default_resolved_ballot_capacity() -> usize {
    256
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./coop_data")
}

fn default_lmdb_map_size() -> usize {
    64 * 1024 * 1024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.governance.validate()?;
        if self.guild_id.get() == 0 {
            return Err(NodeError::Config("guild_id is not set".into()));
        }
        for (name, channel) in [
            ("election_channel", self.election_channel),
            ("sacrifice_channel", self.sacrifice_channel),
            ("feed_channel", self.feed_channel),
        ] {
            if channel.get() == 0 {
                return Err(NodeError::Config(format!("{name} is not set")));
            }
        }
        if self.condemn_emoji == self.protect_emoji {
            return Err(NodeError::Config(
                "condemn_emoji and protect_emoji must differ".into(),
            ));
        }
        if self.tick_secs == 0 {
            return Err(NodeError::Config("tick_secs must be positive".into()));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn fetch_gap(&self) -> Duration {
        Duration::from_millis(self.fetch_gap_ms)
    }

    pub fn transient_ttl(&self) -> Duration {
        Duration::from_secs(self.transient_ttl_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guild_id: unset_guild(),
            election_channel: unset_channel(),
            sacrifice_channel: unset_channel(),
            feed_channel: unset_channel(),
            vote_emoji: default_vote_emoji(),
            condemn_emoji: default_condemn_emoji(),
            protect_emoji: default_protect_emoji(),
            tick_secs: default_tick_secs(),
            fetch_gap_ms: default_fetch_gap_ms(),
            idle_refresh_secs: default_idle_refresh_secs(),
            transient_ttl_secs: default_transient_ttl_secs(),
            resolved_ballot_capacity: default_resolved_ballot_capacity(),
            enforce_sacrifice: false,
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            governance: GovernanceParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> EngineConfig {
        EngineConfig {
            guild_id: GuildId::new(1),
            election_channel: ChannelId::new(2),
            sacrifice_channel: ChannelId::new(3),
            feed_channel: ChannelId::new(4),
            ..Default::default()
        }
    }

    #[test]
    fn configured_round_trips_through_toml() {
        let config = configured();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.guild_id, config.guild_id);
        assert_eq!(parsed.feed_channel, config.feed_channel);
        assert_eq!(parsed.governance, config.governance);
        assert_eq!(parsed.vote_emoji, "👑");
        parsed.validate().unwrap();
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.tick_secs, 60);
        assert_eq!(config.fetch_gap_ms, 666);
        assert_eq!(config.governance.duration_secs, 7 * 86_400);
        assert_eq!(config.governance.leader_fraction_bps, 250);
        assert_eq!(config.log_format, "human");
        assert!(!config.enforce_sacrifice);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            guild_id = 10
            election_channel = 11
            sacrifice_channel = 12
            feed_channel = 13
            enforce_sacrifice = true

            [governance]
            interval_secs = 1000
            duration_secs = 100
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.guild_id, GuildId::new(10));
        assert_eq!(config.governance.interval_secs, 1000);
        assert_eq!(config.governance.protect_fraction_bps, 200);
        assert!(config.enforce_sacrifice);
        config.validate().unwrap();
    }

    #[test]
    fn unset_channels_are_rejected() {
        let config = EngineConfig {
            feed_channel: ChannelId::new(0),
            ..configured()
        };
        assert!(matches!(config.validate(), Err(NodeError::Config(m)) if m.contains("feed_channel")));
    }

    #[test]
    fn window_longer_than_interval_is_rejected() {
        let mut config = configured();
        config.governance.interval_secs = config.governance.duration_secs;
        assert!(matches!(config.validate(), Err(NodeError::Governance(_))));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let config = EngineConfig {
            log_format: "xml".into(),
            ..configured()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = EngineConfig::from_toml_file("/nonexistent/path/coop.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
