//! Position acquisition behind one interface.
//!
//! Two backends exist: [`PollingBackend`] drives a browser-style position source on a
//! timer and hands out numeric watch ids, [`NativeBackend`] wraps an OS location
//! service that pushes updates through a subscription. Which one is used is decided
//! once, by [`select_backend`], when the application is composed.

mod native;
mod polling;
mod throttle;

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::LocationError,
    models::{Coordinates, GeoState},
};

pub use native::NativeBackend;
pub use polling::PollingBackend;
pub use throttle::{distance_meters, Throttle};

/// Receives every position delivered by a running watch.
pub type UpdateCallback = Arc<dyn Fn(GeoState) + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Accuracy {
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::BestForNavigation,
            min_interval: Duration::from_millis(4_000),
            min_distance_m: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    /// Upper bound on a single fix, including the permission prompt.
    pub fix_timeout: Duration,
    pub watch: WatchOptions,
    /// How often the polling backend samples its source while watching.
    pub poll_interval: Duration,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            fix_timeout: Duration::from_secs(15),
            watch: WatchOptions::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Browser-style geolocation: one-shot reads, no push updates.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError>;
}

/// OS location service with an explicit permission step and pushed updates.
#[async_trait]
pub trait PlatformLocator: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError>;

    /// Start delivering positions; delivery ends when the receiver is dropped.
    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<Coordinates>, LocationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchId(pub u32);

/// Live subscription to an OS location stream. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    pub fn remove(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Handle to a running watch, in the shape of whichever backend issued it.
#[derive(Debug)]
pub enum WatchHandle {
    Polling(WatchId),
    Native(Subscription),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Polling,
    Native,
}

#[async_trait]
pub trait LocationService: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn current_fix(&self) -> Result<GeoState, LocationError>;

    /// `Ok(None)` when tracking could not start because permission was refused.
    async fn start_watch(
        &self,
        on_update: UpdateCallback,
    ) -> Result<Option<WatchHandle>, LocationError>;

    /// Idempotent; unknown or already stopped handles are ignored.
    fn stop_watch(&self, handle: WatchHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Ios,
    Android,
    Desktop,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Platform::Web
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Desktop
        }
    }

    pub fn default_backend(&self) -> BackendKind {
        match self {
            Platform::Web => BackendKind::Polling,
            Platform::Ios | Platform::Android | Platform::Desktop => BackendKind::Native,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Polling,
    Native,
}

/// Platform collaborators handed in by the host shell. Either may be missing.
#[derive(Clone, Default)]
pub struct LocationProviders {
    pub position_source: Option<Arc<dyn PositionSource>>,
    pub platform_locator: Option<Arc<dyn PlatformLocator>>,
}

pub fn select_backend(
    preference: BackendPreference,
    platform: Platform,
    providers: LocationProviders,
    settings: TrackingSettings,
) -> Result<Arc<dyn LocationService>> {
    let kind = match preference {
        BackendPreference::Auto => platform.default_backend(),
        BackendPreference::Polling => BackendKind::Polling,
        BackendPreference::Native => BackendKind::Native,
    };

    log::info!("[LOCATION] using {kind:?} backend on {platform:?}");

    match kind {
        BackendKind::Polling => match providers.position_source {
            Some(source) => Ok(Arc::new(PollingBackend::new(source, settings))),
            None => bail!("polling location backend selected but no position source was provided"),
        },
        BackendKind::Native => match providers.platform_locator {
            Some(locator) => Ok(Arc::new(NativeBackend::new(locator, settings))),
            None => bail!("native location backend selected but no platform locator was provided"),
        },
    }
}

async fn bounded<F>(limit: Duration, read: F) -> Result<Coordinates, LocationError>
where
    F: std::future::Future<Output = Result<Coordinates, LocationError>>,
{
    match tokio::time::timeout(limit, read).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl PositionSource for Fixed {
        async fn current_position(&self, _: Accuracy) -> Result<Coordinates, LocationError> {
            Ok(Coordinates::new(1.0, 2.0))
        }
    }

    #[test]
    fn web_polls_everything_else_is_native() {
        assert_eq!(Platform::Web.default_backend(), BackendKind::Polling);
        assert_eq!(Platform::Android.default_backend(), BackendKind::Native);
        assert_eq!(Platform::Ios.default_backend(), BackendKind::Native);
    }

    #[test]
    fn selection_requires_matching_provider() {
        let providers = LocationProviders {
            position_source: Some(Arc::new(Fixed)),
            platform_locator: None,
        };

        let backend = select_backend(
            BackendPreference::Auto,
            Platform::Web,
            providers.clone(),
            TrackingSettings::default(),
        )
        .unwrap();
        assert_eq!(backend.kind(), BackendKind::Polling);

        assert!(select_backend(
            BackendPreference::Native,
            Platform::Web,
            providers,
            TrackingSettings::default(),
        )
        .is_err());
    }
}
