use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{
    bounded, Accuracy, BackendKind, LocationService, PermissionStatus, PlatformLocator,
    Subscription, TrackingSettings, UpdateCallback, WatchHandle,
};
use crate::{error::LocationError, log_debug, log_info, log_warn, models::GeoState};

const ENABLE_LOGS: bool = true;

/// Tracks through the operating system's location service.
pub struct NativeBackend {
    locator: Arc<dyn PlatformLocator>,
    settings: TrackingSettings,
}

impl NativeBackend {
    pub fn new(locator: Arc<dyn PlatformLocator>, settings: TrackingSettings) -> Self {
        Self { locator, settings }
    }
}

#[async_trait]
impl LocationService for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn current_fix(&self) -> Result<GeoState, LocationError> {
        let locator = self.locator.clone();
        let coords = bounded(self.settings.fix_timeout, async move {
            if locator.request_permission().await != PermissionStatus::Granted {
                return Err(LocationError::PermissionDenied);
            }
            locator.current_position(Accuracy::Highest).await
        })
        .await?;
        Ok(GeoState::from(coords))
    }

    async fn start_watch(
        &self,
        on_update: UpdateCallback,
    ) -> Result<Option<WatchHandle>, LocationError> {
        if self.locator.request_permission().await != PermissionStatus::Granted {
            log_info!("[LOCATION] permission denied, live tracking not started");
            return Ok(None);
        }

        let mut updates = self.locator.watch_position(self.settings.watch).await?;
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    next = updates.recv() => match next {
                        Some(coords) => on_update(GeoState::from(coords)),
                        None => {
                            log_debug!("[LOCATION] native stream closed by platform");
                            break;
                        }
                    },
                }
            }
        });

        log_debug!("[LOCATION] native subscription started");
        Ok(Some(WatchHandle::Native(Subscription::new(token, task))))
    }

    fn stop_watch(&self, handle: WatchHandle) {
        match handle {
            WatchHandle::Native(subscription) => {
                subscription.remove();
                log_debug!("[LOCATION] native subscription removed");
            }
            WatchHandle::Polling(id) => {
                log_warn!("[LOCATION] native backend ignoring polling watch {id:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{location::WatchOptions, models::Coordinates};

    struct Locator {
        permission: PermissionStatus,
        feed: Mutex<Option<mpsc::Sender<Coordinates>>>,
    }

    impl Locator {
        fn new(permission: PermissionStatus) -> Arc<Self> {
            Arc::new(Self {
                permission,
                feed: Mutex::new(None),
            })
        }

        fn feed(&self) -> mpsc::Sender<Coordinates> {
            self.feed.lock().unwrap().clone().expect("watch not started")
        }
    }

    #[async_trait]
    impl PlatformLocator for Locator {
        async fn request_permission(&self) -> PermissionStatus {
            self.permission
        }

        async fn current_position(&self, _: Accuracy) -> Result<Coordinates, LocationError> {
            Ok(Coordinates::new(12.9716, 77.5946))
        }

        async fn watch_position(
            &self,
            _options: WatchOptions,
        ) -> Result<mpsc::Receiver<Coordinates>, LocationError> {
            let (tx, rx) = mpsc::channel(8);
            *self.feed.lock().unwrap() = Some(tx);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn denied_permission_fails_fix_and_skips_watch() {
        let backend = NativeBackend::new(
            Locator::new(PermissionStatus::Denied),
            TrackingSettings::default(),
        );
        assert_eq!(
            backend.current_fix().await.unwrap_err(),
            LocationError::PermissionDenied
        );

        let handle = backend.start_watch(Arc::new(|_: GeoState| {})).await.unwrap();
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn subscription_forwards_until_removed() {
        let locator = Locator::new(PermissionStatus::Granted);
        let backend = NativeBackend::new(locator.clone(), TrackingSettings::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: UpdateCallback = Arc::new(move |geo: GeoState| {
            let _ = tx.send(geo);
        });

        let fix = backend.current_fix().await.unwrap();
        assert_eq!(fix.label, "12.9716, 77.5946");

        let handle = backend.start_watch(callback).await.unwrap().unwrap();
        let feed = locator.feed();
        feed.send(Coordinates::new(12.98, 77.6)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().label, "12.9800, 77.6000");

        backend.stop_watch(handle);
        // The forwarder exits and releases the callback.
        assert!(rx.recv().await.is_none());
    }
}
