use async_trait::async_trait;

use super::KeyValueStore;
use crate::{db::Database, error::PersistenceError};

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.get_entry(key)
            .await
            .map_err(|err| PersistenceError::ReadFailed {
                key: key.to_string(),
                reason: format!("{err:#}"),
            })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.put_entry(key, value)
            .await
            .map_err(|err| PersistenceError::WriteFailed {
                key: key.to_string(),
                reason: format!("{err:#}"),
            })
    }
}
