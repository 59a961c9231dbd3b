//! Plain value types shared by the persistence layer and the safety store.

pub mod geo;
pub mod help_center;
pub mod payload;
pub mod report;
pub mod sos;

pub use geo::{format_label, Coordinates, GeoState, LOCATION_UNAVAILABLE};
pub use help_center::{HelpCenter, HelpCenterKind};
pub use payload::{Language, PersistedPayload};
pub use report::{ReportInput, ReportInputError, ReportStatus, SafetyReport, MIN_DESCRIPTION_LEN};
pub use sos::SosLog;
