use serde::{Deserialize, Serialize};

pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

/// A single position reading in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Last known location plus the label shown next to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub label: String,
}

impl Default for GeoState {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            label: LOCATION_UNAVAILABLE.into(),
        }
    }
}

impl GeoState {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

impl From<Coordinates> for GeoState {
    fn from(coords: Coordinates) -> Self {
        Self {
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
            label: format_label(Some(coords)),
        }
    }
}

/// "lat, lon" with four decimals, or the unavailable placeholder.
pub fn format_label(coords: Option<Coordinates>) -> String {
    match coords {
        Some(c) if c.latitude.is_finite() && c.longitude.is_finite() => {
            format!("{:.4}, {:.4}", c.latitude, c.longitude)
        }
        _ => LOCATION_UNAVAILABLE.into(),
    }
}
