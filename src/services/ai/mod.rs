pub mod http;

use async_trait::async_trait;

use crate::models::IntentHint;

/// Optional enrichment over the deterministic extractors. Implementations
/// return `None` on any failure; callers never branch on why.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> Option<IntentHint>;
}

/// Used when no classifier endpoint is configured.
pub struct NoopClassifier;

#[async_trait]
impl IntentClassifier for NoopClassifier {
    async fn classify(&self, _message: &str) -> Option<IntentHint> {
        None
    }
}
