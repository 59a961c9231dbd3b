use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoState;

/// One SOS episode. `stopped_at == None` means the episode is still running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SosLog {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recipients: Vec<String>,
}

impl SosLog {
    pub fn begin(
        id: String,
        started_at: DateTime<Utc>,
        location: &GeoState,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            id,
            started_at,
            stopped_at: None,
            latitude: location.latitude,
            longitude: location.longitude,
            recipients,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stopped_at.is_none()
    }
}
