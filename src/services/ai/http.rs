use async_trait::async_trait;
use serde_json::json;

use super::IntentClassifier;
use crate::models::IntentHint;

/// HTTP adapter for the external intent classifier. Strictly best-effort:
/// transport errors, non-2xx statuses, and unparseable bodies all collapse
/// to `None` with a debug log and never block the extraction path.
pub struct HttpIntentClassifier {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpIntentClassifier {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(&self, message: &str) -> Option<IntentHint> {
        let resp = self
            .client
            .post(format!("{}/v1/classify", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "message": message }))
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = %r.status(), "classifier returned non-success, skipping hint");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "classifier unreachable, skipping hint");
                return None;
            }
        };

        match resp.json::<IntentHint>().await {
            Ok(hint) => Some(hint),
            Err(e) => {
                tracing::debug!(error = %e, "classifier response unparseable, skipping hint");
                None
            }
        }
    }
}
