use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ConversationRecord, Phase, Slot, SESSION_TTL_MINUTES};
use crate::services::conversation::{self, SelectionOutcome};
use crate::services::session;
use crate::state::AppState;

const SESSION_COOKIE: &str = "ds_session";

fn read_session(headers: &HeaderMap, state: &Arc<AppState>) -> Option<ConversationRecord> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = cookies
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))?;
    session::decode(token, &state.config.session_secret, Utc::now())
}

fn session_set_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_TTL_MINUTES * 60
    )
}

fn session_clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Serializes the next record into the Set-Cookie header, or clears the
/// cookie when the conversation ended. A token that fails to encode degrades
/// to a cleared cookie; the reply still goes out.
fn cookie_for(state: &Arc<AppState>, next: Option<&ConversationRecord>) -> String {
    match next {
        Some(record) => match session::encode(record, &state.config.session_secret) {
            Ok(token) => session_set_cookie(&token),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode conversation token");
                session_clear_cookie()
            }
        },
        None => session_clear_cookie(),
    }
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub phase: &'static str,
    pub slots: Vec<Slot>,
}

// POST /api/chat/message
pub async fn chat_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return AppError::BadRequest("message must not be empty".to_string()).into_response();
    }

    let prior = read_session(&headers, &state);
    let (reply, next) = conversation::process_turn(&state, prior, message).await;

    let body = ChatResponse {
        reply: reply.message,
        phase: next
            .as_ref()
            .map(|r| r.phase.as_str())
            .unwrap_or("cancelled"),
        slots: next
            .as_ref()
            .filter(|r| r.phase == Phase::Suggesting)
            .map(|r| r.offered_slots.clone())
            .unwrap_or_default(),
    };

    (
        [(header::SET_COOKIE, cookie_for(&state, next.as_ref()))],
        Json(body),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SelectResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
}

// POST /api/chat/select
pub async fn select_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SelectRequest>,
) -> Response {
    let prior = read_session(&headers, &state);
    let chosen = Slot {
        start_at: req.start_at,
        end_at: req.end_at,
    };

    let (outcome, next) = conversation::select_slot(&state, prior, chosen).await;

    let body = match outcome {
        SelectionOutcome::Confirmed {
            appointment_id,
            message,
        } => SelectResponse {
            status: "confirmed",
            message,
            appointment_id: Some(appointment_id),
            slots: vec![],
        },
        SelectionOutcome::Conflict { message } => SelectResponse {
            status: "conflict",
            message,
            appointment_id: None,
            slots: vec![],
        },
        SelectionOutcome::Retry { message } => SelectResponse {
            status: "retry",
            message,
            appointment_id: None,
            slots: next
                .as_ref()
                .map(|r| r.offered_slots.clone())
                .unwrap_or_default(),
        },
        SelectionOutcome::Refreshed { slots, message } => SelectResponse {
            status: "refreshed",
            message,
            appointment_id: None,
            slots,
        },
    };

    (
        [(header::SET_COOKIE, cookie_for(&state, next.as_ref()))],
        Json(body),
    )
        .into_response()
}
