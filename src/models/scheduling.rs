use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Address;

/// A concrete bookable interval. Selection compares these exactly, so the
/// pair derives `Eq`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// A slot as returned by the scheduling service's suggest operation, with an
/// optional human-facing reason ("closest crew", "gap fill", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedSlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SuggestedSlot {
    pub fn window(&self) -> Slot {
        Slot {
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub slots: Vec<SuggestedSlot>,
    pub timezone: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestCriteria {
    pub duration_minutes: i64,
    pub address: Address,
    /// Advisory `[start, end)` hour window in the business zone. The service
    /// may ignore it; callers filter locally either way.
    pub hour_window: Option<(u8, u8)>,
}

/// Identifiers a hold or booking is scoped to.
#[derive(Debug, Clone, Serialize)]
pub struct BookingScope {
    pub contact_id: String,
    pub property_id: String,
}

/// Server-issued short-lived claim on a slot.
#[derive(Debug, Clone, Deserialize)]
pub struct Hold {
    pub hold_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfirmation {
    pub appointment_id: String,
    /// Canonical start time as recorded by the scheduling service.
    pub start_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingAppointment {
    pub id: String,
    pub start_at: DateTime<Utc>,
}
