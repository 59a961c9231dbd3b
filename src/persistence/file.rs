use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::PersistenceError;

/// All entries in one JSON object on disk, rewritten on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "[STORE] {} is not a valid store file, starting empty: {err}",
                    path.display()
                );
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, serialized)
            .await
            .with_context(|| format!("Failed to write store to {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut guard = self.data.lock().await;
        let previous = guard.insert(key.to_string(), value.to_string());

        if let Err(err) = self.persist(&guard).await {
            // Keep memory and disk in agreement when the write did not land.
            match previous {
                Some(old) => guard.insert(key.to_string(), old),
                None => guard.remove(key),
            };
            return Err(PersistenceError::WriteFailed {
                key: key.to_string(),
                reason: format!("{err:#}"),
            });
        }
        Ok(())
    }
}
