use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{
    bounded, Accuracy, BackendKind, LocationService, PositionSource, Throttle, TrackingSettings,
    UpdateCallback, WatchHandle, WatchId,
};
use crate::{error::LocationError, log_debug, log_info, log_warn, models::GeoState};

const ENABLE_LOGS: bool = true;

type WatchTable = Arc<Mutex<HashMap<u32, CancellationToken>>>;

/// Tracks by sampling a browser-style source on a fixed period.
pub struct PollingBackend {
    source: Arc<dyn PositionSource>,
    settings: TrackingSettings,
    next_id: AtomicU32,
    watches: WatchTable,
}

impl PollingBackend {
    pub fn new(source: Arc<dyn PositionSource>, settings: TrackingSettings) -> Self {
        Self {
            source,
            settings,
            next_id: AtomicU32::new(1),
            watches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn active_watches(&self) -> usize {
        lock(&self.watches).len()
    }
}

fn lock(table: &WatchTable) -> MutexGuard<'_, HashMap<u32, CancellationToken>> {
    match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl LocationService for PollingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Polling
    }

    async fn current_fix(&self) -> Result<GeoState, LocationError> {
        let coords = bounded(
            self.settings.fix_timeout,
            self.source.current_position(Accuracy::High),
        )
        .await?;
        Ok(GeoState::from(coords))
    }

    async fn start_watch(
        &self,
        on_update: UpdateCallback,
    ) -> Result<Option<WatchHandle>, LocationError> {
        let settings = self.settings;
        let mut throttle = Throttle::new(settings.watch.min_interval, settings.watch.min_distance_m);

        // Read once before committing to a loop; a source without access gets none.
        let first = bounded(
            settings.fix_timeout,
            self.source.current_position(settings.watch.accuracy),
        )
        .await;
        match first {
            Ok(coords) => {
                if throttle.admit(coords, Instant::now()) {
                    on_update(GeoState::from(coords));
                }
            }
            Err(err @ (LocationError::PermissionDenied | LocationError::Unavailable(_))) => {
                log_info!("[LOCATION] polling watch not started: {err}");
                return Ok(None);
            }
            Err(err) => log_debug!("[LOCATION] first watch reading failed: {err}"),
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        lock(&self.watches).insert(id, token.clone());

        let source = self.source.clone();
        let watches = self.watches.clone();

        tokio::spawn(async move {
            let mut ticker = time::interval(settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The read above stands in for the immediate first tick.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let reading = tokio::select! {
                    _ = token.cancelled() => break,
                    reading = bounded(settings.fix_timeout, source.current_position(settings.watch.accuracy)) => reading,
                };

                match reading {
                    Ok(coords) => {
                        if throttle.admit(coords, Instant::now()) {
                            on_update(GeoState::from(coords));
                        }
                    }
                    Err(err @ (LocationError::PermissionDenied | LocationError::Unavailable(_))) => {
                        log_warn!("[LOCATION] watch {id} stopped: {err}");
                        break;
                    }
                    Err(err) => {
                        log_debug!("[LOCATION] watch {id} tracking error: {err}");
                    }
                }
            }

            lock(&watches).remove(&id);
            log_debug!("[LOCATION] watch {id} finished");
        });

        log_debug!("[LOCATION] polling watch {id} started");
        Ok(Some(WatchHandle::Polling(WatchId(id))))
    }

    fn stop_watch(&self, handle: WatchHandle) {
        match handle {
            WatchHandle::Polling(WatchId(id)) => {
                if let Some(token) = lock(&self.watches).remove(&id) {
                    token.cancel();
                    log_debug!("[LOCATION] polling watch {id} cleared");
                }
            }
            WatchHandle::Native(subscription) => {
                log_warn!("[LOCATION] polling backend was handed a native subscription");
                subscription.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use tokio::sync::mpsc;

    use super::*;
    use crate::models::Coordinates;

    struct Scripted {
        readings: Mutex<VecDeque<Result<Coordinates, LocationError>>>,
        fallback: Result<Coordinates, LocationError>,
    }

    impl Scripted {
        fn new(
            readings: Vec<Result<Coordinates, LocationError>>,
            fallback: Result<Coordinates, LocationError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                readings: Mutex::new(readings.into()),
                fallback,
            })
        }
    }

    #[async_trait]
    impl PositionSource for Scripted {
        async fn current_position(&self, _: Accuracy) -> Result<Coordinates, LocationError> {
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    struct Silent;

    #[async_trait]
    impl PositionSource for Silent {
        async fn current_position(&self, _: Accuracy) -> Result<Coordinates, LocationError> {
            std::future::pending().await
        }
    }

    fn collector() -> (UpdateCallback, mpsc::UnboundedReceiver<GeoState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: UpdateCallback = Arc::new(move |geo: GeoState| {
            let _ = tx.send(geo);
        });
        (callback, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn single_fix_times_out() {
        let backend = PollingBackend::new(Arc::new(Silent), TrackingSettings::default());
        let err = backend.current_fix().await.unwrap_err();
        assert_eq!(err, LocationError::Timeout(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn single_fix_formats_label() {
        let source = Scripted::new(vec![], Ok(Coordinates::new(19.076_09, 72.877_426)));
        let backend = PollingBackend::new(source, TrackingSettings::default());
        let fix = backend.current_fix().await.unwrap();
        assert_eq!(fix.label, "19.0761, 72.8774");
    }

    #[tokio::test(start_paused = true)]
    async fn watch_throttles_and_stops() {
        let here = Coordinates::new(28.6139, 77.2090);
        let far = Coordinates::new(28.6200, 77.2090);
        let source = Scripted::new(vec![Ok(here), Ok(here), Ok(far)], Ok(far));
        let backend = PollingBackend::new(source, TrackingSettings::default());
        let (callback, mut rx) = collector();

        let handle = backend.start_watch(callback).await.unwrap().unwrap();
        assert_eq!(backend.active_watches(), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.latitude, Some(28.6139));
        // The repeated reading is suppressed, the jump is delivered.
        let second = rx.recv().await.unwrap();
        assert_eq!(second.latitude, Some(28.62));

        backend.stop_watch(handle);
        assert_eq!(backend.active_watches(), 0);
        // Stopping again is a no-op.
        backend.stop_watch(WatchHandle::Polling(WatchId(999)));
    }

    #[tokio::test(start_paused = true)]
    async fn denied_permission_skips_watch() {
        let source = Scripted::new(vec![], Err(LocationError::PermissionDenied));
        let backend = PollingBackend::new(source, TrackingSettings::default());
        let (callback, mut rx) = collector();

        assert!(backend.start_watch(callback).await.unwrap().is_none());
        assert!(rx.recv().await.is_none());
        assert_eq!(backend.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_geolocation_skips_watch() {
        let source = Scripted::new(
            vec![],
            Err(LocationError::Unavailable("no geolocation api".into())),
        );
        let backend = PollingBackend::new(source, TrackingSettings::default());
        let (callback, _rx) = collector();

        assert!(backend.start_watch(callback).await.unwrap().is_none());
        assert_eq!(backend.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn source_going_away_ends_watch() {
        let here = Coordinates::new(28.6139, 77.2090);
        let source = Scripted::new(
            vec![Ok(here)],
            Err(LocationError::Unavailable("gps switched off".into())),
        );
        let backend = PollingBackend::new(source, TrackingSettings::default());
        let (callback, mut rx) = collector();

        assert!(backend.start_watch(callback).await.unwrap().is_some());
        assert_eq!(rx.recv().await.unwrap().latitude, Some(28.6139));

        // The loop exits and drops the callback, closing the channel.
        assert!(rx.recv().await.is_none());
        assert_eq!(backend.active_watches(), 0);
    }
}
