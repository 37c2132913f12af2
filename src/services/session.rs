//! Conversation state store: the whole session rides in a signed,
//! time-limited token held by the client. There is no server-side session
//! table; a token outside its inactivity window is simply a fresh start.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::models::ConversationRecord;

fn sign(secret: &str, payload: &str) -> Option<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Serializes and signs a record into an opaque `payload.signature` token.
pub fn encode(record: &ConversationRecord, secret: &str) -> anyhow::Result<String> {
    let json = serde_json::to_vec(record)?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let sig = sign(secret, &payload)
        .ok_or_else(|| anyhow::anyhow!("session secret unusable as HMAC key"))?;
    Ok(format!("{payload}.{sig}"))
}

/// Verifies and deserializes a token. Bad signature, malformed payload, and
/// expired records all decode to `None`; the caller starts a fresh
/// conversation rather than erroring. Offered slots inside the record are
/// only ever trusted through this path, so the TTL check lives here.
pub fn decode(token: &str, secret: &str, now: DateTime<Utc>) -> Option<ConversationRecord> {
    let (payload, sig) = token.split_once('.')?;

    let expected = sign(secret, payload)?;
    if expected != sig {
        tracing::debug!("conversation token signature mismatch, dropping");
        return None;
    }

    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let record: ConversationRecord = serde_json::from_slice(&json).ok()?;

    if record.is_expired(now) {
        tracing::debug!("conversation token past inactivity window, dropping");
        return None;
    }

    Some(record)
}
