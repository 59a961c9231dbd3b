use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::{
    config::CoreConfig,
    error::{PersistenceError, StoreError},
    location::{distance_meters, LocationService, UpdateCallback, WatchHandle},
    models::{
        GeoState, HelpCenter, Language, PersistedPayload, ReportInput, ReportStatus,
        SafetyReport, SosLog,
    },
    persistence::{encode, PersistenceGateway, PersistenceWriter, StorageKey},
    utils::ids::{new_profile_id, new_record_id},
};

use super::{SafetyStats, StoreEvent, StoreState};

const EVENT_CAPACITY: usize = 64;

/// Deployment-specific inputs to the store.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Recipients recorded on every SOS log, in this order.
    pub emergency_contacts: Vec<String>,
    pub close_orphaned_sos: bool,
    pub help_centers: Vec<HelpCenter>,
}

impl From<&CoreConfig> for StoreOptions {
    fn from(config: &CoreConfig) -> Self {
        Self {
            emergency_contacts: config.emergency_contacts.clone(),
            close_orphaned_sos: config.recovery.close_orphaned_sos,
            help_centers: config.help_centers.clone(),
        }
    }
}

/// The single owner of reports, SOS logs and session state.
///
/// Mutations apply to memory synchronously and queue a full snapshot of the touched
/// collection for durable storage; the write completes in the background. Cloning is
/// cheap and every clone operates on the same state.
#[derive(Clone)]
pub struct SafetyStore {
    state: Arc<Mutex<StoreState>>,
    gateway: PersistenceGateway,
    writer: PersistenceWriter,
    location: Arc<dyn LocationService>,
    watch: Arc<Mutex<Option<WatchHandle>>>,
    sos_gate: Arc<tokio::sync::Mutex<()>>,
    events: broadcast::Sender<StoreEvent>,
    options: Arc<StoreOptions>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SafetyStore {
    /// Must be called from within a tokio runtime; the persistence writer is spawned here.
    pub fn new(
        gateway: PersistenceGateway,
        location: Arc<dyn LocationService>,
        options: StoreOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let failure_events = events.clone();
        let (writer, _task) = PersistenceWriter::spawn(
            gateway.clone(),
            Arc::new(move |key: StorageKey, err: &PersistenceError| {
                let _ = failure_events.send(StoreEvent::PersistenceFailed {
                    key: key.to_string(),
                    message: err.to_string(),
                });
            }),
        );

        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
            gateway,
            writer,
            location,
            watch: Arc::new(Mutex::new(None)),
            sos_gate: Arc::new(tokio::sync::Mutex::new(())),
            events,
            options: Arc::new(options),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        lock(&self.state)
    }

    // ── Hydration ────────────────────────────────────────────────────────────

    /// Load persisted state into memory. Runs the storage reads only until the first
    /// hydration succeeds; afterwards it just returns the current state.
    pub async fn initialize(&self) -> PersistedPayload {
        if self.state().is_hydrated() {
            return self.snapshot();
        }

        let stored = self.gateway.load().await;
        self.hydrate(PersistedPayload {
            reports: stored.reports,
            sos_logs: stored.sos_logs,
            language: stored.language,
            profile_id: stored.profile_id.unwrap_or_default(),
        });
        self.snapshot()
    }

    /// Apply bootstrap data. Returns false, changing nothing, once hydration has happened.
    pub fn hydrate(&self, mut payload: PersistedPayload) -> bool {
        let generated_profile = payload.profile_id.trim().is_empty();
        if generated_profile {
            payload.profile_id = new_profile_id();
        }

        let (reports, sos_logs) = {
            let mut state = self.state();
            if !state.hydrate(payload) {
                debug!("[STORE] ignoring repeated bootstrap data");
                return false;
            }

            if generated_profile {
                info!("[STORE] created anonymous profile {}", state.profile_id);
                self.writer
                    .enqueue(StorageKey::Profile, state.profile_id.clone());
            }

            if self.options.close_orphaned_sos {
                let closed = state.close_orphaned(Utc::now());
                if closed > 0 {
                    warn!("[SOS] closed {closed} episode(s) left open by a previous run");
                    self.persist_sos_logs(&state);
                }
            }

            (state.reports.len(), state.sos_logs.len())
        };

        info!("[STORE] hydrated {reports} report(s), {sos_logs} SOS log(s)");
        self.emit(StoreEvent::Hydrated { reports, sos_logs });
        true
    }

    fn ensure_hydrated(state: &StoreState) -> Result<(), StoreError> {
        if state.is_hydrated() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    fn persist_reports(&self, state: &StoreState) {
        self.persist(StorageKey::Reports, encode(StorageKey::Reports, &state.reports));
    }

    fn persist_sos_logs(&self, state: &StoreState) {
        self.persist(StorageKey::SosLogs, encode(StorageKey::SosLogs, &state.sos_logs));
    }

    fn persist(&self, key: StorageKey, encoded: Result<String, PersistenceError>) {
        match encoded {
            Ok(value) => {
                self.writer.enqueue(key, value);
            }
            Err(err) => {
                error!("[STORE] not persisting {key}: {err}");
                self.emit(StoreEvent::PersistenceFailed {
                    key: key.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Wait for every queued durable write to be attempted.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    // ── Reports ──────────────────────────────────────────────────────────────

    /// Store a new `Pending` report stamped with the current location. Input is not
    /// validated here; see [`ReportInput::validate`].
    pub fn submit_report(&self, input: ReportInput) -> Result<SafetyReport, StoreError> {
        let report = {
            let mut state = self.state();
            Self::ensure_hydrated(&state)?;
            let report = SafetyReport::from_input(
                new_record_id(),
                input,
                &state.current_location,
                Utc::now(),
            );
            state.add_report(report.clone());
            self.persist_reports(&state);
            report
        };

        info!("[REPORT] submitted {}", report.id);
        self.emit(StoreEvent::ReportSubmitted(report.clone()));
        Ok(report)
    }

    /// Returns `Ok(false)` when no report has `id`; nothing is written in that case.
    pub fn update_report_status(&self, id: &str, status: ReportStatus) -> Result<bool, StoreError> {
        {
            let mut state = self.state();
            Self::ensure_hydrated(&state)?;
            if !state.set_report_status(id, status) {
                debug!("[REPORT] status update for unknown report {id}");
                return Ok(false);
            }
            self.persist_reports(&state);
        }

        info!("[REPORT] {id} marked {status}");
        self.emit(StoreEvent::ReportStatusChanged {
            id: id.to_string(),
            status,
        });
        Ok(true)
    }

    // ── Preferences ──────────────────────────────────────────────────────────

    pub fn toggle_language(&self) -> Result<Language, StoreError> {
        let language = {
            let mut state = self.state();
            Self::ensure_hydrated(&state)?;
            let language = state.toggle_language();
            self.writer
                .enqueue(StorageKey::Language, language.as_str().to_string());
            language
        };

        self.emit(StoreEvent::LanguageChanged(language));
        Ok(language)
    }

    // ── Location ─────────────────────────────────────────────────────────────

    /// Acquire a fresh fix. On failure the last known location is returned and a
    /// retryable `LocationFailed` event is published.
    pub async fn refresh_location(&self) -> GeoState {
        match self.location.current_fix().await {
            Ok(geo) => {
                self.state().current_location = geo.clone();
                self.emit(StoreEvent::LocationUpdated(geo.clone()));
                geo
            }
            Err(err) => {
                warn!("[LOCATION] refresh failed: {err}");
                self.emit(StoreEvent::LocationFailed {
                    message: format!(
                        "Unable to fetch location ({err}). Check permissions and try again."
                    ),
                    retryable: true,
                });
                self.current_location()
            }
        }
    }

    // ── SOS ──────────────────────────────────────────────────────────────────

    /// Begin an SOS episode and live tracking. While an episode is already active this
    /// returns that episode's log instead of opening a second one, resuming tracking
    /// if no watch is running for it (an episode restored from storage has none).
    pub async fn start_sos(&self) -> Result<SosLog, StoreError> {
        let _gate = self.sos_gate.lock().await;

        let resumed = {
            let mut state = self.state();
            Self::ensure_hydrated(&state)?;
            let active = state.active_log().cloned();
            if active.is_some() {
                state.sos_active = true;
            }
            active
        };

        if let Some(active) = resumed {
            warn!("[SOS] start requested while {} is active", active.id);
            if !self.has_active_watch() {
                self.begin_tracking().await;
            }
            return Ok(active);
        }

        let location = self.refresh_location().await;
        let log = SosLog::begin(
            new_record_id(),
            Utc::now(),
            &location,
            self.options.emergency_contacts.clone(),
        );

        {
            let mut state = self.state();
            state.begin_sos(log.clone());
            self.persist_sos_logs(&state);
        }

        info!(
            "[SOS] Sending alert to {:?} from {}",
            log.recipients, location.label
        );
        self.emit(StoreEvent::SosStarted(log.clone()));

        self.begin_tracking().await;
        Ok(log)
    }

    async fn begin_tracking(&self) {
        let state = self.state.clone();
        let events = self.events.clone();
        let on_update: UpdateCallback = Arc::new(move |geo: GeoState| {
            lock(&state).current_location = geo.clone();
            let _ = events.send(StoreEvent::LocationUpdated(geo));
        });

        match self.location.start_watch(on_update).await {
            Ok(Some(handle)) => self.install_watch(handle),
            Ok(None) => info!("[SOS] live tracking not available, continuing without it"),
            Err(err) => {
                warn!("[SOS] live tracking failed to start: {err}");
                self.emit(StoreEvent::LocationFailed {
                    message: format!("Live tracking could not start ({err})."),
                    retryable: true,
                });
            }
        }
    }

    fn install_watch(&self, handle: WatchHandle) {
        let previous = lock(&self.watch).replace(handle);
        if let Some(previous) = previous {
            debug!("[SOS] replacing existing location watch");
            self.location.stop_watch(previous);
        }
    }

    fn release_watch(&self) {
        let handle = lock(&self.watch).take();
        if let Some(handle) = handle {
            self.location.stop_watch(handle);
        }
    }

    /// End live tracking and close the active episode. Returns the closed log, or
    /// `None` when nothing was active.
    pub async fn stop_sos(&self) -> Result<Option<SosLog>, StoreError> {
        let _gate = self.sos_gate.lock().await;

        Self::ensure_hydrated(&self.state())?;
        self.release_watch();

        let stopped = {
            let mut state = self.state();
            let stopped = state.finish_sos(Utc::now());
            if stopped.is_some() {
                self.persist_sos_logs(&state);
            }
            stopped
        };

        match &stopped {
            Some(log) => {
                info!("[SOS] tracking stopped for {}", log.id);
                self.emit(StoreEvent::SosStopped(log.clone()));
            }
            None => debug!("[SOS] stop requested with no active episode"),
        }
        Ok(stopped)
    }

    // ── Read-only projections ────────────────────────────────────────────────

    pub fn reports(&self) -> Vec<SafetyReport> {
        self.state().reports.clone()
    }

    pub fn sos_logs(&self) -> Vec<SosLog> {
        self.state().sos_logs.clone()
    }

    pub fn stats(&self) -> SafetyStats {
        self.state().stats()
    }

    pub fn current_location(&self) -> GeoState {
        self.state().current_location.clone()
    }

    pub fn is_sos_active(&self) -> bool {
        self.state().sos_active
    }

    pub fn language(&self) -> Language {
        self.state().language
    }

    pub fn profile_id(&self) -> String {
        self.state().profile_id.clone()
    }

    /// True until hydration has completed.
    pub fn bootstrap_loading(&self) -> bool {
        !self.state().is_hydrated()
    }

    pub fn emergency_contacts(&self) -> &[String] {
        &self.options.emergency_contacts
    }

    pub fn has_active_watch(&self) -> bool {
        lock(&self.watch).is_some()
    }

    pub fn snapshot(&self) -> PersistedPayload {
        self.state().payload()
    }

    /// Configured help centers, closest first when the current location is known.
    pub fn nearest_help_centers(&self, limit: usize) -> Vec<HelpCenter> {
        let origin = self.state().current_location.coordinates();
        let mut centers = self.options.help_centers.clone();
        if let Some(origin) = origin {
            centers.sort_by(|a, b| {
                distance_meters(origin, a.coordinates())
                    .total_cmp(&distance_meters(origin, b.coordinates()))
            });
        }
        centers.truncate(limit);
        centers
    }
}
