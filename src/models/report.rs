use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoState;

/// Shortest description the report form accepts, counted in characters after trimming.
pub const MIN_DESCRIPTION_LEN: usize = 12;

/// Administrative review state of a report. Any status may be set from any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    Pending,
    Verified,
    Forwarded,
    Resolved,
}

impl Default for ReportStatus {
    fn default() -> Self {
        ReportStatus::Pending
    }
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Verified,
        ReportStatus::Forwarded,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Verified => "Verified",
            ReportStatus::Forwarded => "Forwarded",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(ReportStatus::Pending),
            "Verified" => Ok(ReportStatus::Verified),
            "Forwarded" => Ok(ReportStatus::Forwarded),
            "Resolved" => Ok(ReportStatus::Resolved),
            other => Err(format!("unknown report status {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub id: String,
    pub description: String,
    pub vehicle_number: Option<String>,
    pub instagram_account: Option<String>,
    pub phone_number: Option<String>,
    pub location_label: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_uri: Option<String>,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub status: ReportStatus,
}

impl SafetyReport {
    /// Builds a fresh `Pending` report, stamping it with the given location.
    pub fn from_input(
        id: String,
        input: ReportInput,
        location: &GeoState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            description: input.description.trim().to_string(),
            vehicle_number: non_blank(&input.vehicle_number),
            instagram_account: non_blank(&input.instagram_account),
            phone_number: non_blank(&input.phone_number),
            location_label: location.label.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            image_uri: input.image_uri,
            anonymous: input.anonymous,
            created_at,
            status: ReportStatus::Pending,
        }
    }
}

/// Raw form values as the report screen collects them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub description: String,
    pub vehicle_number: String,
    pub instagram_account: String,
    pub phone_number: String,
    pub image_uri: Option<String>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportInputError {
    #[error("description must have at least {min} characters, got {actual}")]
    DescriptionTooShort { min: usize, actual: usize },
}

impl ReportInput {
    /// Form-level check for the presentation layer. The store accepts any input.
    pub fn validate(&self) -> Result<(), ReportInputError> {
        let actual = self.description.trim().chars().count();
        if actual < MIN_DESCRIPTION_LEN {
            return Err(ReportInputError::DescriptionTooShort {
                min: MIN_DESCRIPTION_LEN,
                actual,
            });
        }
        Ok(())
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
