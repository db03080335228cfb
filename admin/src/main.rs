//! coop-admin: inspect and repair the governance engine's persisted state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use coop_governance::{required_votes, CycleWindow, SacrificeThresholds};
use coop_node::{init_logging, CycleStateRepo, EngineConfig};
use coop_store::BallotStore;
use coop_store_lmdb::{LmdbBallotStore, LmdbEnvironment};
use coop_types::{MessageRef, Timestamp};
use coop_utils::{format_calendar, humanize_secs};

#[derive(Parser)]
#[command(name = "coop-admin", about = "Coop governance engine operator tool")]
struct Cli {
    /// Path to the engine's TOML configuration file.
    #[arg(long, env = "COOP_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory; overrides the config file's `data_dir`.
    #[arg(long, env = "COOP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "COOP_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the election cycle state.
    State,
    /// List the candidates standing in the current cycle.
    Candidates,
    /// Compute election and sacrifice thresholds for a population.
    Quorum {
        #[arg(long)]
        population: u64,
    },
    /// Point the engine at a new status surface (`channel/message` or a link).
    SetStatusSurface { link: String },
    /// Drop candidates, votes and the cycle flag. Campaign messages on the
    /// platform are left alone.
    Reset {
        /// Keep the status surface link.
        #[arg(long)]
        keep_status_surface: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_logging(config.log_format()?, &config.log_level);

    match cli.command {
        Command::Quorum { population } => print_quorum(&config, population),
        Command::State => {
            let (repo, _) = open_store(&config)?;
            print_state(&config, &repo)?;
        }
        Command::Candidates => {
            let (_, ballots) = open_store(&config)?;
            print_candidates(&ballots)?;
        }
        Command::SetStatusSurface { link } => {
            let surface = MessageRef::parse_link(&link)?;
            let (repo, _) = open_store(&config)?;
            repo.set_status_surface(surface)?;
            tracing::info!(surface = %surface, "status surface updated");
            println!("status surface set to {surface}");
        }
        Command::Reset {
            keep_status_surface,
        } => {
            let (repo, ballots) = open_store(&config)?;
            ballots.delete_all_votes()?;
            ballots.delete_all_candidates()?;
            repo.reset(keep_status_surface)?;
            tracing::warn!(keep_status_surface, "election state reset by operator");
            println!("election state reset");
        }
    }
    Ok(())
}

fn open_store(config: &EngineConfig) -> anyhow::Result<(CycleStateRepo, LmdbBallotStore)> {
    let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let (config_store, ballots) = env.into_stores();
    Ok((CycleStateRepo::new(Arc::new(config_store)), ballots))
}

fn print_state(config: &EngineConfig, repo: &CycleStateRepo) -> anyhow::Result<()> {
    let state = repo.load()?;
    let window = CycleWindow::anchored(state.last_started_at, &config.governance);
    let now = Timestamp::now();

    println!("running:        {}", state.is_on);
    println!("last started:   {}", format_calendar(state.last_started_at));
    println!("voting ends:    {}", format_calendar(window.ends_at));
    println!(
        "next election:  {} (in {})",
        format_calendar(window.next_start),
        humanize_secs(window.next_start.as_secs().saturating_sub(now.as_secs()))
    );
    match repo.status_surface()? {
        Some(surface) => println!("status surface: {}", surface.link(config.guild_id)),
        None => println!("status surface: (not set)"),
    }
    if let Some(results) = repo.last_results()? {
        println!("elected:        {}", format_calendar(results.cycle));
        println!("commander:      {}", results.commander);
        for leader in results.leaders {
            println!("leader:         {leader}");
        }
    }
    Ok(())
}

fn print_candidates(ballots: &dyn BallotStore) -> anyhow::Result<()> {
    let candidates = ballots.list_candidates()?;
    let votes = ballots.list_votes()?;
    if candidates.is_empty() {
        println!("nobody is standing");
    }
    for candidate in candidates {
        let recorded = votes
            .iter()
            .filter(|v| v.candidate_id == candidate.candidate_id)
            .count();
        println!(
            "{}  surface {}  registered {}  recorded votes {}",
            candidate.candidate_id,
            candidate.ballot,
            format_calendar(candidate.registered_at),
            recorded
        );
    }
    Ok(())
}

fn print_quorum(config: &EngineConfig, population: u64) {
    let params = &config.governance;
    let sacrifice = SacrificeThresholds::for_population(population, params);
    println!(
        "leader ranks:   1..{}",
        required_votes(population, params.leader_fraction_bps)
    );
    println!("condemn votes:  {}", sacrifice.condemn);
    println!("protect votes:  {}", sacrifice.protect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_reset_flags() {
        let cli = Cli::try_parse_from(["coop-admin", "reset", "--keep-status-surface"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Reset {
                keep_status_surface: true
            }
        ));
    }

    #[test]
    fn quorum_requires_population() {
        assert!(Cli::try_parse_from(["coop-admin", "quorum"]).is_err());
        let cli = Cli::try_parse_from(["coop-admin", "quorum", "--population", "400"]).unwrap();
        assert!(matches!(cli.command, Command::Quorum { population: 400 }));
    }
}
