use serde::Serialize;

use crate::models::{GeoState, Language, ReportStatus, SafetyReport, SosLog};

/// Notifications for the presentation layer, published after each state change.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StoreEvent {
    #[serde(rename_all = "camelCase")]
    Hydrated { reports: usize, sos_logs: usize },
    LocationUpdated(GeoState),
    /// Retryable, user-facing: the UI should offer to try again.
    LocationFailed { message: String, retryable: bool },
    SosStarted(SosLog),
    SosStopped(SosLog),
    ReportSubmitted(SafetyReport),
    #[serde(rename_all = "camelCase")]
    ReportStatusChanged { id: String, status: ReportStatus },
    LanguageChanged(Language),
    PersistenceFailed { key: String, message: String },
}

impl StoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::Hydrated { .. } => "store-hydrated",
            StoreEvent::LocationUpdated(_) => "location-updated",
            StoreEvent::LocationFailed { .. } => "location-failed",
            StoreEvent::SosStarted(_) => "sos-started",
            StoreEvent::SosStopped(_) => "sos-stopped",
            StoreEvent::ReportSubmitted(_) => "report-submitted",
            StoreEvent::ReportStatusChanged { .. } => "report-status-changed",
            StoreEvent::LanguageChanged(_) => "language-changed",
            StoreEvent::PersistenceFailed { .. } => "persistence-failed",
        }
    }
}
