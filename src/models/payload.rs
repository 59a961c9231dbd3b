use serde::{Deserialize, Serialize};

use super::{SafetyReport, SosLog};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    /// Anything other than "hi" falls back to English.
    pub fn from_code(value: &str) -> Self {
        match value.trim() {
            "hi" => Language::Hi,
            _ => Language::En,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Hi,
            Language::Hi => Language::En,
        }
    }
}

/// Everything the store keeps across restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPayload {
    pub reports: Vec<SafetyReport>,
    pub sos_logs: Vec<SosLog>,
    pub language: Language,
    pub profile_id: String,
}
