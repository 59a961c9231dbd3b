#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use sheshield_core::{
    location::{
        Accuracy, NativeBackend, PermissionStatus, PlatformLocator, PositionSource,
        TrackingSettings, WatchOptions,
    },
    models::Coordinates,
    KeyValueStore, LocationError, LocationService, MemoryStore, PersistenceError,
    PersistenceGateway, SafetyStore, StoreEvent, StoreOptions,
};
use tokio::sync::{broadcast, mpsc};

pub const CONTACTS: [&str; 2] = ["+919900112233", "+919900221133"];
pub const NAMESPACE: &str = "she_shield";

pub fn options() -> StoreOptions {
    StoreOptions {
        emergency_contacts: CONTACTS.iter().map(|c| c.to_string()).collect(),
        close_orphaned_sos: true,
        help_centers: Vec::new(),
    }
}

/// OS-style locator whose permission, fix and live feed are driven by the test.
pub struct FakeLocator {
    permission: Mutex<PermissionStatus>,
    fix: Mutex<Result<Coordinates, LocationError>>,
    feed: Mutex<Option<mpsc::Sender<Coordinates>>>,
    pub watch_calls: AtomicUsize,
}

impl FakeLocator {
    pub fn granted(fix: Coordinates) -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(PermissionStatus::Granted),
            fix: Mutex::new(Ok(fix)),
            feed: Mutex::new(None),
            watch_calls: AtomicUsize::new(0),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(PermissionStatus::Denied),
            fix: Mutex::new(Err(LocationError::PermissionDenied)),
            feed: Mutex::new(None),
            watch_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_fix(&self, fix: Result<Coordinates, LocationError>) {
        *self.fix.lock().unwrap() = fix;
    }

    /// Sender for the most recent watch, if one was started.
    pub fn feed(&self) -> Option<mpsc::Sender<Coordinates>> {
        self.feed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformLocator for FakeLocator {
    async fn request_permission(&self) -> PermissionStatus {
        *self.permission.lock().unwrap()
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinates, LocationError> {
        self.fix.lock().unwrap().clone()
    }

    async fn watch_position(
        &self,
        _options: WatchOptions,
    ) -> Result<mpsc::Receiver<Coordinates>, LocationError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        *self.feed.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// Browser-style source that always answers with the configured reading.
pub struct FakeSource {
    reading: Mutex<Result<Coordinates, LocationError>>,
}

impl FakeSource {
    pub fn new(reading: Result<Coordinates, LocationError>) -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(reading),
        })
    }
}

#[async_trait]
impl PositionSource for FakeSource {
    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinates, LocationError> {
        self.reading.lock().unwrap().clone()
    }
}

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed {
                key: key.to_string(),
                reason: "secure store rejected the write".into(),
            });
        }
        self.inner.set(key, value).await
    }
}

pub fn native(locator: Arc<FakeLocator>) -> Arc<dyn LocationService> {
    Arc::new(NativeBackend::new(locator, TrackingSettings::default()))
}

pub fn gateway(storage: Arc<dyn KeyValueStore>) -> PersistenceGateway {
    PersistenceGateway::new(storage, NAMESPACE)
}

/// A hydrated store over `storage` using the given locator.
pub async fn ready_store(
    storage: Arc<dyn KeyValueStore>,
    locator: Arc<FakeLocator>,
    options: StoreOptions,
) -> SafetyStore {
    let store = SafetyStore::new(gateway(storage), native(locator), options);
    store.initialize().await;
    store
}

pub fn drain(rx: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn delhi() -> Coordinates {
    Coordinates::new(28.613_939, 77.209_021)
}
