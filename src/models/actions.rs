use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Address;

/// Fixed taxonomy of operator-assistant action kinds, in presentation
/// priority order (contact first, booking last).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateContact,
    CreateQuote,
    CreateTask,
    CreateReminder,
    AddContactNote,
    SendText,
    RescheduleAppointment,
    BookAppointment,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateContact => "create_contact",
            ActionKind::CreateQuote => "create_quote",
            ActionKind::CreateTask => "create_task",
            ActionKind::CreateReminder => "create_reminder",
            ActionKind::AddContactNote => "add_contact_note",
            ActionKind::SendText => "send_text",
            ActionKind::RescheduleAppointment => "reschedule_appointment",
            ActionKind::BookAppointment => "book_appointment",
        }
    }
}

/// Machine-usable payload for one candidate action. Detectors that cannot
/// assemble a complete payload emit nothing; there is no free-text-only
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    CreateContact {
        name: String,
        phone: Option<String>,
        email: Option<String>,
        address: Address,
    },
    CreateQuote {
        contact_id: String,
        property_id: String,
        services: Vec<String>,
    },
    CreateTask {
        contact_id: String,
        property_id: String,
        title: String,
    },
    CreateReminder {
        remind_on: NaiveDate,
        start_hour: Option<u8>,
        note: String,
        appointment_id: Option<String>,
    },
    AddContactNote {
        contact_id: String,
        note: String,
    },
    SendText {
        to: String,
        body: String,
    },
    RescheduleAppointment {
        appointment_id: Uuid,
        requested_day: Option<NaiveDate>,
    },
    BookAppointment {
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        quoted_total_cents: Option<i64>,
    },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CreateContact { .. } => ActionKind::CreateContact,
            ActionPayload::CreateQuote { .. } => ActionKind::CreateQuote,
            ActionPayload::CreateTask { .. } => ActionKind::CreateTask,
            ActionPayload::CreateReminder { .. } => ActionKind::CreateReminder,
            ActionPayload::AddContactNote { .. } => ActionKind::AddContactNote,
            ActionPayload::SendText { .. } => ActionKind::SendText,
            ActionPayload::RescheduleAppointment { .. } => ActionKind::RescheduleAppointment,
            ActionPayload::BookAppointment { .. } => ActionKind::BookAppointment,
        }
    }
}

/// A proposed, unexecuted CRM operation. Computed fresh per message and
/// handed straight to the presenting layer; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAction {
    pub id: Uuid,
    pub summary: String,
    pub note: Option<String>,
    #[serde(flatten)]
    pub payload: ActionPayload,
}

impl CandidateAction {
    pub fn new(summary: String, note: Option<String>, payload: ActionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            summary,
            note,
            payload,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }
}
