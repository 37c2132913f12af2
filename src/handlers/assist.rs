use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{CandidateAction, SuggestCriteria};
use crate::services::extract;
use crate::services::suggestions::{self, MessageContext};
use crate::state::AppState;

#[allow(clippy::result_large_err)]
fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), Response> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized.into_response());
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct AssistRequest {
    pub message: String,
    pub contact_id: Option<String>,
    pub property_id: Option<String>,
    pub contact_phone: Option<String>,
    /// Known service address, used to scope slot suggestions for booking
    /// candidates.
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct AssistResponse {
    pub actions: Vec<CandidateAction>,
}

fn wants_booking(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["book", "schedule", "appointment"]
        .iter()
        .any(|t| lower.contains(t))
}

// POST /api/assist/suggest
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssistRequest>,
) -> Result<Json<AssistResponse>, Response> {
    check_auth(&headers, &state.config.admin_token)?;

    tracing::info!("processing operator assist message");

    // Enrichment only; a dead classifier changes nothing downstream.
    let hint = state.classifier.classify(&req.message).await;

    let upcoming = match (req.contact_id.as_deref(), req.property_id.as_deref()) {
        (Some(contact_id), Some(property_id)) => state
            .crm
            .lookup_upcoming_appointment(contact_id, property_id)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "upcoming appointment lookup failed, continuing");
                None
            }),
        _ => None,
    };

    // Slot suggestions are computed once here; the booking detector reuses
    // them and never fetches on its own.
    let address = req
        .address
        .as_deref()
        .and_then(extract::extract_address)
        .or_else(|| extract::extract_address(&req.message))
        .or_else(|| {
            hint.as_ref()
                .and_then(|h| h.address.as_deref())
                .and_then(extract::extract_address)
        });
    let slot_suggestions = match address {
        Some(address) if wants_booking(&req.message) => state
            .scheduler
            .suggest(&SuggestCriteria {
                duration_minutes: state.config.default_job_minutes,
                address,
                hour_window: None,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "slot suggestion for assist failed, continuing");
            })
            .ok(),
        _ => None,
    };

    let today = Utc::now()
        .with_timezone(&state.config.business_tz())
        .date_naive();
    let ctx = MessageContext {
        message: &req.message,
        contact_id: req.contact_id.as_deref(),
        property_id: req.property_id.as_deref(),
        contact_phone: req.contact_phone.as_deref(),
        upcoming: upcoming.as_ref(),
        slot_suggestions: slot_suggestions.as_ref(),
        hint: hint.as_ref(),
        today,
    };

    Ok(Json(AssistResponse {
        actions: suggestions::suggest_actions(&ctx),
    }))
}
