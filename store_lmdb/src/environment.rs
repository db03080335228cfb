//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Env, EnvOpenOptions};

use crate::{LmdbBallotStore, LmdbConfigStore, LmdbError};

const MAX_DBS: u32 = 8;

/// Default map size: 64 MiB is far more than one community ever needs.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    config: LmdbConfigStore,
    ballots: LmdbBallotStore,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment directory is owned by this process; it is
        // never opened twice concurrently with different options.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };
        let env = Arc::new(env);

        let mut wtxn = env.write_txn()?;
        let config_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("config"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;
        let candidates_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("candidates"))?;
        let candidate_by_user_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("candidate_by_user"))?;
        let candidate_by_surface_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("candidate_by_surface"))?;
        let votes_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("election_votes"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            config: LmdbConfigStore {
                env: Arc::clone(&env),
                config_db,
            },
            ballots: LmdbBallotStore {
                env: Arc::clone(&env),
                meta_db,
                candidates_db,
                candidate_by_user_db,
                candidate_by_surface_db,
                votes_db,
            },
            env,
        })
    }

    pub fn config_store(&self) -> &LmdbConfigStore {
        &self.config
    }

    pub fn ballot_store(&self) -> &LmdbBallotStore {
        &self.ballots
    }

    /// Split into owned stores for sharing across tasks.
    pub fn into_stores(self) -> (LmdbConfigStore, LmdbBallotStore) {
        (self.config, self.ballots)
    }

    /// Flush the environment to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}
