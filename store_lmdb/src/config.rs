//! LMDB implementation of ConfigStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use coop_store::{ConfigStore, StoreError};

use crate::LmdbError;

pub struct LmdbConfigStore {
    pub(crate) env: Arc<Env>,
    pub(crate) config_db: Database<Bytes, Bytes>,
}

impl ConfigStore for LmdbConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .config_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let value = std::str::from_utf8(bytes)
                    .map_err(|e| LmdbError::Serialization(format!("config '{key}': {e}")))?;
                Ok(Some(value.to_string()))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.config_db
            .put(&mut wtxn, key.as_bytes(), value.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.config_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
    use coop_store::keys;

    #[test]
    fn set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        let store = env.config_store();

        assert_eq!(store.get(keys::ELECTION_ON).unwrap(), None);
        store.set(keys::ELECTION_ON, "true").unwrap();
        assert_eq!(store.get(keys::ELECTION_ON).unwrap().as_deref(), Some("true"));
        store.set(keys::ELECTION_ON, "false").unwrap();
        assert_eq!(store.get(keys::ELECTION_ON).unwrap().as_deref(), Some("false"));
        store.delete(keys::ELECTION_ON).unwrap();
        assert_eq!(store.get(keys::ELECTION_ON).unwrap(), None);
        // Deleting again is fine.
        store.delete(keys::ELECTION_ON).unwrap();
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
            env.config_store()
                .set(keys::LAST_ELECTION, "1700000000")
                .unwrap();
            env.sync().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        assert_eq!(
            env.config_store().get(keys::LAST_ELECTION).unwrap().as_deref(),
            Some("1700000000")
        );
    }
}
