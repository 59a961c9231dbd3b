//! State and persistence core of the SheShield personal-safety app.
//!
//! The host shell builds one [`SafetyStore`] at startup (see [`bootstrap`]), handing it
//! platform location collaborators, and then drives it from the UI: submitting
//! incident reports, starting and stopping SOS episodes, and reading projections
//! such as [`SafetyStore::stats`].

pub mod config;
mod db;
pub mod error;
pub mod location;
pub mod models;
pub mod persistence;
pub mod store;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::info;

pub use config::{CoreConfig, StorageBackend};
pub use db::Database;
pub use error::{LocationError, PersistenceError, StoreError};
pub use location::{LocationProviders, LocationService, Platform};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, PersistenceGateway};
pub use store::{SafetyStats, SafetyStore, StoreEvent, StoreOptions};
pub use utils::logging::init_logging;

/// Open the durable store named by `config`.
pub fn open_storage(config: &CoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    let path = config.storage_path();
    let storage: Arc<dyn KeyValueStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(Database::new(path)?),
        StorageBackend::File => Arc::new(JsonFileStore::open(path)?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(storage)
}

/// Set up logging, then compose and hydrate the safety store. Must run inside a tokio
/// runtime. A logger installed earlier by the host is left in place.
pub async fn bootstrap(config: CoreConfig, providers: LocationProviders) -> Result<SafetyStore> {
    init_logging(config.log_filter());
    info!("SheShield core starting up...");

    let storage = open_storage(&config)?;
    let gateway = PersistenceGateway::new(storage, &config.namespace);
    let location = location::select_backend(
        config.location.backend,
        Platform::current(),
        providers,
        config.location.tracking(),
    )?;

    let store = SafetyStore::new(gateway, location, StoreOptions::from(&config));
    store.initialize().await;
    Ok(store)
}
