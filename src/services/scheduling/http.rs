use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::json;

use super::{SchedulingProvider, SlotConflict};
use crate::models::{BookingConfirmation, BookingScope, Hold, SuggestCriteria, SuggestResponse};

/// HTTP client for the external scheduling service. Conflicts ride on 409
/// with an `error` code in the body; anything else non-2xx is an outage.
pub struct HttpSchedulingProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSchedulingProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn classify_conflict(resp: reqwest::Response) -> anyhow::Result<SlotConflict> {
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse scheduling conflict body")?;
        Ok(SlotConflict::from_code(
            data["error"].as_str().unwrap_or("server_error"),
        ))
    }
}

#[async_trait]
impl SchedulingProvider for HttpSchedulingProvider {
    async fn suggest(&self, criteria: &SuggestCriteria) -> anyhow::Result<SuggestResponse> {
        let mut body = json!({
            "duration_minutes": criteria.duration_minutes,
            "address": criteria.address,
        });
        if let Some((start, end)) = criteria.hour_window {
            body["hour_window"] = json!({ "start": start, "end": end });
        }

        let resp = self
            .client
            .post(format!("{}/v1/slots/suggest", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call scheduling suggest")?
            .error_for_status()
            .context("scheduling suggest returned error")?;

        resp.json()
            .await
            .context("failed to parse suggest response")
    }

    async fn hold(
        &self,
        start_at: DateTime<Utc>,
        scope: &BookingScope,
    ) -> anyhow::Result<Result<Hold, SlotConflict>> {
        let resp = self
            .client
            .post(format!("{}/v1/holds", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "start_at": start_at,
                "contact_id": scope.contact_id,
                "property_id": scope.property_id,
            }))
            .send()
            .await
            .context("failed to call scheduling hold")?;

        match resp.status() {
            StatusCode::CONFLICT => Ok(Err(Self::classify_conflict(resp).await?)),
            s if s.is_success() => Ok(Ok(resp
                .json()
                .await
                .context("failed to parse hold response")?)),
            s => anyhow::bail!("scheduling hold returned {s}"),
        }
    }

    async fn book(
        &self,
        start_at: DateTime<Utc>,
        scope: &BookingScope,
        hold_id: Option<&str>,
    ) -> anyhow::Result<Result<BookingConfirmation, SlotConflict>> {
        let mut body = json!({
            "start_at": start_at,
            "contact_id": scope.contact_id,
            "property_id": scope.property_id,
        });
        if let Some(id) = hold_id {
            body["hold_id"] = json!(id);
        }

        let resp = self
            .client
            .post(format!("{}/v1/bookings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call scheduling book")?;

        match resp.status() {
            StatusCode::CONFLICT => Ok(Err(Self::classify_conflict(resp).await?)),
            s if s.is_success() => Ok(Ok(resp
                .json()
                .await
                .context("failed to parse booking response")?)),
            s => anyhow::bail!("scheduling book returned {s}"),
        }
    }
}
