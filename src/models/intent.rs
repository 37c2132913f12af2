use serde::{Deserialize, Serialize};

/// Best-effort structured hint from the external intent classifier. Purely
/// additive: the deterministic extractors never depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentHint {
    pub intent: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub when: Option<String>,
}
