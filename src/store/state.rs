use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GeoState, Language, PersistedPayload, ReportStatus, SafetyReport, SosLog};

/// Counters shown on the dashboard. Always derived, never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyStats {
    pub total_reports: usize,
    pub pending: usize,
    pub resolved: usize,
    pub sos_count: usize,
    pub active_sos: usize,
}

/// In-memory state owned by the safety store. Collections are kept newest first.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub reports: Vec<SafetyReport>,
    pub sos_logs: Vec<SosLog>,
    pub language: Language,
    pub profile_id: String,
    pub current_location: GeoState,
    pub sos_active: bool,
    hydrated: bool,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Replace persisted fields with `payload`. Only the first call has any effect.
    pub fn hydrate(&mut self, payload: PersistedPayload) -> bool {
        if self.hydrated {
            return false;
        }
        self.hydrated = true;
        self.reports = payload.reports;
        self.sos_logs = payload.sos_logs;
        self.language = payload.language;
        self.profile_id = payload.profile_id;
        self.sos_active = self.active_index().is_some();
        true
    }

    pub fn payload(&self) -> PersistedPayload {
        PersistedPayload {
            reports: self.reports.clone(),
            sos_logs: self.sos_logs.clone(),
            language: self.language,
            profile_id: self.profile_id.clone(),
        }
    }

    pub fn add_report(&mut self, report: SafetyReport) {
        self.reports.insert(0, report);
    }

    /// Returns false, leaving everything untouched, when no report has `id`.
    pub fn set_report_status(&mut self, id: &str, status: ReportStatus) -> bool {
        match self.reports.iter_mut().find(|report| report.id == id) {
            Some(report) => {
                report.status = status;
                true
            }
            None => false,
        }
    }

    fn active_index(&self) -> Option<usize> {
        self.sos_logs
            .iter()
            .enumerate()
            .filter(|(_, log)| log.is_active())
            .max_by_key(|(_, log)| log.started_at)
            .map(|(index, _)| index)
    }

    /// Most recently started log that has not been stopped.
    pub fn active_log(&self) -> Option<&SosLog> {
        self.active_index().map(|index| &self.sos_logs[index])
    }

    pub fn begin_sos(&mut self, log: SosLog) {
        self.sos_logs.insert(0, log);
        self.sos_active = true;
    }

    /// Close the active episode, if any, and return it.
    pub fn finish_sos(&mut self, stopped_at: DateTime<Utc>) -> Option<SosLog> {
        self.sos_active = false;
        let index = self.active_index()?;
        let log = &mut self.sos_logs[index];
        log.stopped_at = Some(stopped_at);
        Some(log.clone())
    }

    /// Close every unfinished log; used when a previous run died mid-episode.
    pub fn close_orphaned(&mut self, stopped_at: DateTime<Utc>) -> usize {
        let mut closed = 0;
        for log in self.sos_logs.iter_mut().filter(|log| log.is_active()) {
            log.stopped_at = Some(stopped_at);
            closed += 1;
        }
        self.sos_active = false;
        closed
    }

    pub fn toggle_language(&mut self) -> Language {
        self.language = self.language.toggled();
        self.language
    }

    pub fn stats(&self) -> SafetyStats {
        let count_status = |status: ReportStatus| {
            self.reports
                .iter()
                .filter(|report| report.status == status)
                .count()
        };

        SafetyStats {
            total_reports: self.reports.len(),
            pending: count_status(ReportStatus::Pending),
            resolved: count_status(ReportStatus::Resolved),
            sos_count: self.sos_logs.len(),
            active_sos: self.sos_logs.iter().filter(|log| log.is_active()).count(),
        }
    }
}
