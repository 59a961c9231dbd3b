use serde::{Deserialize, Serialize};

use super::Coordinates;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HelpCenterKind {
    Police,
    #[serde(rename = "NGO")]
    Ngo,
}

/// A police station or NGO the app can point people to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelpCenter {
    pub id: String,
    pub name: String,
    pub kind: HelpCenterKind,
    pub phone: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl HelpCenter {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
