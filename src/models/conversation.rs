use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::scheduling::Slot;

/// Inactivity window after which a client-held conversation token is rejected.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Upper bound on slots kept on offer in a single conversation turn.
pub const MAX_OFFERED_SLOTS: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingName,
    AwaitingAddress,
    AwaitingPhone,
    Suggesting,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingName => "awaiting_name",
            Phase::AwaitingAddress => "awaiting_address",
            Phase::AwaitingPhone => "awaiting_phone",
            Phase::Suggesting => "suggesting",
        }
    }
}

/// A postal address, always fully populated or absent entirely. The
/// extraction layer never produces a partial one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

impl Address {
    /// Canonical single-line form: "street, city, REGION postal".
    pub fn normalized(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.line1, self.city, self.region, self.postal_code
        )
    }
}

/// A user-stated day and/or time-of-day band used to narrow slot offers.
/// Hours are a half-open interval `[start_hour, end_hour)` in the business
/// time zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimePreference {
    pub day: Option<NaiveDate>,
    pub start_hour: Option<u8>,
    pub end_hour: Option<u8>,
    pub label: Option<String>,
}

impl TimePreference {
    pub fn is_empty(&self) -> bool {
        self.day.is_none() && self.start_hour.is_none()
    }

    /// Merge a newly extracted preference into this one: each dimension the
    /// new preference specifies wins, dimensions it omits survive.
    pub fn merge(&mut self, other: TimePreference) {
        if other.day.is_some() {
            self.day = other.day;
        }
        if other.start_hour.is_some() {
            self.start_hour = other.start_hour;
            self.end_hour = other.end_hour;
        }
        if other.label.is_some() {
            self.label = other.label;
        }
    }
}

/// Client-side view of a short-lived slot reservation. A hold never
/// guarantees the slot; `book` re-validates regardless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HoldRef {
    pub hold_id: String,
    pub slot_start: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The entire conversation state. Lives exclusively inside the signed
/// client-held token; the server keeps no session table for the public flow.
///
/// Two browser sessions for the same person carry two independent tokens and
/// can each acquire a hold on a different slot. Cross-device reconciliation
/// is unresolved upstream and deliberately not attempted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub phase: Phase,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub contact_id: Option<String>,
    pub property_id: Option<String>,
    pub offered_slots: Vec<Slot>,
    pub time_preference: Option<TimePreference>,
    pub hold: Option<HoldRef>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Idle,
            contact_name: None,
            phone: None,
            email: None,
            address: None,
            contact_id: None,
            property_id: None,
            offered_slots: Vec::new(),
            time_preference: None,
            hold: None,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at > Duration::minutes(SESSION_TTL_MINUTES)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.contact_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
    }

    pub fn has_identifiers(&self) -> bool {
        self.contact_id.is_some() && self.property_id.is_some()
    }
}
