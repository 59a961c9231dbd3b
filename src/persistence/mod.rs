//! Durable key/value storage for the safety store.
//!
//! Four logical entries live under an application namespace: the report list, the SOS
//! log list, the language code and the anonymous profile id. Collections are stored as
//! JSON arrays and always overwritten whole.

mod file;
mod memory;
mod sqlite;
mod writer;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use log::warn;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::PersistenceError,
    models::{Language, SafetyReport, SosLog},
};

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use writer::{FailureHook, PersistenceWriter};

/// Raw string storage. Implementations never interpret the values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Reports,
    SosLogs,
    Language,
    Profile,
}

impl StorageKey {
    pub fn suffix(&self) -> &'static str {
        match self {
            StorageKey::Reports => "reports",
            StorageKey::SosLogs => "sos_logs",
            StorageKey::Language => "language",
            StorageKey::Profile => "profile",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What hydration found in storage. Absent or unreadable entries are empty / `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub reports: Vec<SafetyReport>,
    pub sos_logs: Vec<SosLog>,
    pub language: Language,
    pub profile_id: Option<String>,
}

/// Typed access to the four namespaced entries of a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    namespace: Arc<str>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: Arc::from(namespace),
        }
    }

    pub fn key(&self, key: StorageKey) -> String {
        format!("{}_{}", self.namespace, key.suffix())
    }

    /// Read errors are logged and reported as absence.
    pub async fn read(&self, key: StorageKey) -> Option<String> {
        match self.store.get(&self.key(key)).await {
            Ok(value) => value,
            Err(err) => {
                warn!("[STORE] treating {key} as absent: {err}");
                None
            }
        }
    }

    pub async fn write(&self, key: StorageKey, value: &str) -> Result<(), PersistenceError> {
        self.store.set(&self.key(key), value).await
    }

    pub async fn load(&self) -> StoredState {
        let (reports, sos_logs, language, profile_id) = tokio::join!(
            self.read(StorageKey::Reports),
            self.read(StorageKey::SosLogs),
            self.read(StorageKey::Language),
            self.read(StorageKey::Profile),
        );

        StoredState {
            reports: decode_list(StorageKey::Reports, reports),
            sos_logs: decode_list(StorageKey::SosLogs, sos_logs),
            language: language
                .as_deref()
                .map(Language::from_code)
                .unwrap_or_default(),
            profile_id: profile_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub async fn load_reports(&self) -> Vec<SafetyReport> {
        let raw = self.read(StorageKey::Reports).await;
        decode_list(StorageKey::Reports, raw)
    }

    pub async fn load_sos_logs(&self) -> Vec<SosLog> {
        let raw = self.read(StorageKey::SosLogs).await;
        decode_list(StorageKey::SosLogs, raw)
    }
}

pub fn encode<T: Serialize + ?Sized>(key: StorageKey, value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|err| PersistenceError::Encode {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn decode_list<T: DeserializeOwned>(key: StorageKey, raw: Option<String>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(err) => {
            warn!("[STORE] discarding undecodable {key} entry: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(store: MemoryStore) -> PersistenceGateway {
        PersistenceGateway::new(Arc::new(store), "she_shield")
    }

    #[test]
    fn keys_are_namespaced() {
        let gateway = gateway(MemoryStore::new());
        assert_eq!(gateway.key(StorageKey::Reports), "she_shield_reports");
        assert_eq!(gateway.key(StorageKey::SosLogs), "she_shield_sos_logs");
        assert_eq!(gateway.key(StorageKey::Language), "she_shield_language");
        assert_eq!(gateway.key(StorageKey::Profile), "she_shield_profile");
    }

    #[tokio::test]
    async fn empty_store_loads_defaults() {
        let state = gateway(MemoryStore::new()).load().await;
        assert_eq!(state, StoredState::default());
    }

    #[tokio::test]
    async fn corrupt_and_unknown_values_fall_back() {
        let store = MemoryStore::with_entries([
            ("she_shield_reports", "{not json"),
            ("she_shield_language", "fr"),
            ("she_shield_profile", "  "),
        ]);
        let state = gateway(store).load().await;
        assert!(state.reports.is_empty());
        assert_eq!(state.language, Language::En);
        assert_eq!(state.profile_id, None);
    }

    #[tokio::test]
    async fn reads_legacy_app_payload() {
        let reports = r#"[{
            "id": "1718000000000_ab12cd",
            "description": "Suspicious van following me",
            "vehicleNumber": "DL 01 AB 1234",
            "instagramAccount": null,
            "phoneNumber": null,
            "locationLabel": "28.6139, 77.2090",
            "latitude": 28.6139,
            "longitude": 77.209,
            "imageUri": null,
            "anonymous": true,
            "createdAt": "2024-06-10T08:15:30.123Z",
            "status": "Forwarded"
        }]"#;
        let logs = r#"[{
            "id": "1718000000001_zz99yy",
            "startedAt": "2024-06-10T08:20:00.000Z",
            "stoppedAt": null,
            "latitude": null,
            "longitude": null,
            "recipients": ["+919900112233", "+919900221133"]
        }]"#;
        let store = MemoryStore::with_entries([
            ("she_shield_reports", reports),
            ("she_shield_sos_logs", logs),
            ("she_shield_language", "hi"),
            ("she_shield_profile", "anon_1718000000000_q1w2e3"),
        ]);

        let state = gateway(store).load().await;

        assert_eq!(state.reports.len(), 1);
        assert_eq!(state.reports[0].vehicle_number.as_deref(), Some("DL 01 AB 1234"));
        assert_eq!(state.reports[0].status, crate::models::ReportStatus::Forwarded);
        assert_eq!(state.sos_logs.len(), 1);
        assert!(state.sos_logs[0].is_active());
        assert_eq!(state.language, Language::Hi);
        assert_eq!(state.profile_id.as_deref(), Some("anon_1718000000000_q1w2e3"));
    }
}
