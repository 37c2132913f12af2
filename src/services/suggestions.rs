//! Mines one operator message for actionable CRM intents. Detectors are
//! independent, evaluated in fixed priority order, deduplicated by kind, and
//! capped. A detector that cannot assemble a complete payload emits nothing;
//! this module never errors.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    ActionKind, ActionPayload, CandidateAction, IntentHint, SuggestResponse, UpcomingAppointment,
};
use crate::services::extract::{self, PreferenceSignal};

/// Hard cap on candidates surfaced per message.
pub const MAX_CANDIDATES: usize = 3;

/// Everything a detector may draw on for one message. Slot suggestions are
/// whatever was already computed this turn; detectors never fetch.
pub struct MessageContext<'a> {
    pub message: &'a str,
    pub contact_id: Option<&'a str>,
    pub property_id: Option<&'a str>,
    pub contact_phone: Option<&'a str>,
    pub upcoming: Option<&'a UpcomingAppointment>,
    pub slot_suggestions: Option<&'a SuggestResponse>,
    pub hint: Option<&'a IntentHint>,
    pub today: NaiveDate,
}

impl<'a> MessageContext<'a> {
    fn note(&self) -> Option<String> {
        extract::extract_note(self.message)
            .or_else(|| self.hint.and_then(|h| h.note.clone()))
    }

    fn known_pair(&self) -> Option<(String, String)> {
        Some((self.contact_id?.to_string(), self.property_id?.to_string()))
    }
}

pub trait Detector: Send + Sync {
    fn kind(&self) -> ActionKind;
    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction>;
}

/// Evaluates every detector in priority order and returns at most
/// [`MAX_CANDIDATES`] candidates, one per action kind.
pub fn suggest_actions(ctx: &MessageContext) -> Vec<CandidateAction> {
    static DETECTORS: Lazy<Vec<Box<dyn Detector>>> = Lazy::new(|| {
        vec![
            Box::new(ContactDetector),
            Box::new(QuoteDetector),
            Box::new(TaskDetector),
            Box::new(ReminderDetector),
            Box::new(ContactNoteDetector),
            Box::new(SendTextDetector),
            Box::new(RescheduleDetector),
            Box::new(BookingDetector),
        ]
    });

    let mut out: Vec<CandidateAction> = Vec::new();
    for detector in DETECTORS.iter() {
        if out.len() == MAX_CANDIDATES {
            break;
        }
        if out.iter().any(|c| c.kind() == detector.kind()) {
            continue;
        }
        if let Some(candidate) = detector.detect(ctx) {
            out.push(candidate);
        }
    }
    out
}

fn contains_any(lower: &str, triggers: &[&str]) -> bool {
    triggers.iter().any(|t| lower.contains(t))
}

/// Removes a trailing `note: ...` segment so it doesn't pollute address or
/// title parsing.
fn strip_note(text: &str) -> String {
    static NOTE_SEGMENT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)[,;\s]*\bnotes?:.*$").unwrap());
    NOTE_SEGMENT_RE.replace(text, "").trim().to_string()
}

// ── create-contact ──

struct ContactDetector;

static CONTACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:new customer|new client|add (?:a )?contact|create (?:a )?contact)\b:?\s*([^,]+),\s*(.+)")
        .unwrap()
});

impl Detector for ContactDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateContact
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let cleaned = strip_note(ctx.message);
        let caps = CONTACT_RE.captures(&cleaned)?;

        let name_part = caps[1].trim().to_string();
        let name = if extract::is_plausible_name(&name_part) {
            name_part
        } else {
            ctx.hint.and_then(|h| h.contact_name.clone())?
        };

        let address = extract::extract_address(caps[2].trim()).or_else(|| {
            ctx.hint
                .and_then(|h| h.address.as_deref())
                .and_then(extract::parse_address_parts)
        })?;

        let summary = format!("Create contact {name} at {}", address.normalized());
        Some(CandidateAction::new(
            summary,
            ctx.note(),
            ActionPayload::CreateContact {
                name,
                phone: extract::extract_phone(ctx.message),
                email: extract::extract_email(ctx.message),
                address,
            },
        ))
    }
}

// ── create-quote ──

struct QuoteDetector;

impl Detector for QuoteDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateQuote
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["quote", "estimate", "price"]) {
            return None;
        }
        let (contact_id, property_id) = ctx.known_pair()?;

        let mut services = extract::extract_services(ctx.message);
        if services.is_empty() {
            services = ctx
                .hint
                .map(|h| h.services.clone())
                .unwrap_or_default();
        }
        if services.is_empty() {
            return None;
        }

        let summary = format!("Draft a quote for {}", services.join(", "));
        Some(CandidateAction::new(
            summary,
            ctx.note(),
            ActionPayload::CreateQuote {
                contact_id,
                property_id,
                services,
            },
        ))
    }
}

// ── create-task ──

struct TaskDetector;

impl Detector for TaskDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateTask
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["task", "todo", "to-do"]) {
            return None;
        }
        let (contact_id, property_id) = ctx.known_pair()?;

        let title = strip_note(ctx.message);
        if title.is_empty() {
            return None;
        }

        Some(CandidateAction::new(
            format!("Create task: {title}"),
            ctx.note(),
            ActionPayload::CreateTask {
                contact_id,
                property_id,
                title,
            },
        ))
    }
}

// ── create-reminder ──

struct ReminderDetector;

impl Detector for ReminderDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateReminder
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["remind", "follow up", "follow-up"]) {
            return None;
        }
        // A reminder with no explicit day is unschedulable; reject rather
        // than guess.
        let PreferenceSignal::Set(pref) = extract::extract_time_preference(ctx.message, ctx.today)
        else {
            return None;
        };
        let remind_on = pref.day?;

        let note = ctx
            .note()
            .unwrap_or_else(|| strip_note(ctx.message));

        Some(CandidateAction::new(
            format!("Set a reminder for {remind_on}"),
            None,
            ActionPayload::CreateReminder {
                remind_on,
                start_hour: pref.start_hour,
                note,
                appointment_id: ctx.upcoming.map(|u| u.id.clone()),
            },
        ))
    }
}

// ── add-contact-note ──

struct ContactNoteDetector;

impl Detector for ContactNoteDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::AddContactNote
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let contact_id = ctx.contact_id?.to_string();
        let lower = ctx.message.to_lowercase();
        let note = if contains_any(&lower, &["add a note", "note that"]) {
            ctx.note().unwrap_or_else(|| strip_note(ctx.message))
        } else {
            ctx.note()?
        };
        if note.is_empty() {
            return None;
        }

        Some(CandidateAction::new(
            format!("Add note to contact: {note}"),
            None,
            ActionPayload::AddContactNote { contact_id, note },
        ))
    }
}

// ── send-text ──

struct SendTextDetector;

static TEXT_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:send (?:a )?text|text(?: him| her| them)?|sms)\b.*?\b(?:saying|that says)\s+(.+)$")
        .unwrap()
});

impl Detector for SendTextDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::SendText
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["send a text", "send text", "text ", "sms"]) {
            return None;
        }

        let to = extract::extract_phone(ctx.message)
            .or_else(|| ctx.contact_phone.map(|p| p.to_string()))?;

        let body = TEXT_BODY_RE
            .captures(ctx.message)
            .map(|c| c[1].trim().trim_end_matches(['.', '!']).to_string())
            .or_else(|| ctx.note())?;

        Some(CandidateAction::new(
            format!("Send text to {to}"),
            None,
            ActionPayload::SendText { to, body },
        ))
    }
}

// ── reschedule-appointment ──

struct RescheduleDetector;

impl Detector for RescheduleDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::RescheduleAppointment
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["reschedule", "move the appointment", "move appt"]) {
            return None;
        }
        // The appointment id must be in the message itself, never inferred
        // from context.
        let appointment_id = extract::extract_uuid(ctx.message)?;

        let requested_day = match extract::extract_time_preference(ctx.message, ctx.today) {
            PreferenceSignal::Set(pref) => pref.day,
            _ => None,
        };

        let summary = match ctx.upcoming.filter(|u| u.id == appointment_id.to_string()) {
            Some(u) => format!(
                "Reschedule appointment {appointment_id} (currently {})",
                u.start_at.format("%Y-%m-%d %H:%M")
            ),
            None => format!("Reschedule appointment {appointment_id}"),
        };

        Some(CandidateAction::new(
            summary,
            ctx.note(),
            ActionPayload::RescheduleAppointment {
                appointment_id,
                requested_day,
            },
        ))
    }
}

// ── book-appointment ──

struct BookingDetector;

impl Detector for BookingDetector {
    fn kind(&self) -> ActionKind {
        ActionKind::BookAppointment
    }

    fn detect(&self, ctx: &MessageContext) -> Option<CandidateAction> {
        let lower = ctx.message.to_lowercase();
        if !contains_any(&lower, &["book", "schedule", "appointment"]) {
            return None;
        }
        let first = ctx.slot_suggestions?.slots.first()?;

        let quoted_total_cents = extract::extract_money(ctx.message);
        let summary = match quoted_total_cents {
            Some(cents) => format!(
                "Book {} (quoted ${}.{:02})",
                first.start_at.format("%Y-%m-%d %H:%M"),
                cents / 100,
                cents % 100
            ),
            None => format!("Book {}", first.start_at.format("%Y-%m-%d %H:%M")),
        };

        Some(CandidateAction::new(
            summary,
            ctx.note(),
            ActionPayload::BookAppointment {
                start_at: first.start_at,
                end_at: first.end_at,
                quoted_total_cents,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SuggestedSlot;
    use chrono::{DateTime, Utc};

    fn ctx<'a>(message: &'a str) -> MessageContext<'a> {
        MessageContext {
            message,
            contact_id: None,
            property_id: None,
            contact_phone: None,
            upcoming: None,
            slot_suggestions: None,
            hint: None,
            today: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
    }

    fn known_ctx<'a>(message: &'a str) -> MessageContext<'a> {
        MessageContext {
            contact_id: Some("c-1"),
            property_id: Some("p-1"),
            ..ctx(message)
        }
    }

    fn suggestions() -> SuggestResponse {
        SuggestResponse {
            slots: vec![SuggestedSlot {
                start_at: "2024-06-05T14:00:00Z".parse().unwrap(),
                end_at: "2024-06-05T15:00:00Z".parse().unwrap(),
                reason: None,
            }],
            timezone: "UTC".to_string(),
            duration_minutes: 60,
        }
    }

    #[test]
    fn test_quote_with_note() {
        let actions =
            suggest_actions(&known_ctx("quote for furniture removal, note: tight driveway"));
        let quotes: Vec<_> = actions
            .iter()
            .filter(|a| a.kind() == ActionKind::CreateQuote)
            .collect();
        assert_eq!(quotes.len(), 1);
        let quote = quotes[0];
        assert_eq!(quote.note.as_deref(), Some("tight driveway"));
        match &quote.payload {
            ActionPayload::CreateQuote { services, contact_id, property_id } => {
                assert!(services.contains(&"furniture".to_string()));
                assert_eq!(contact_id, "c-1");
                assert_eq!(property_id, "p-1");
            }
            other => panic!("expected CreateQuote, got {other:?}"),
        }
    }

    #[test]
    fn test_quote_requires_known_contact_and_property() {
        let actions = suggest_actions(&ctx("quote for furniture removal"));
        assert!(actions.iter().all(|a| a.kind() != ActionKind::CreateQuote));
    }

    #[test]
    fn test_contact_requires_full_address() {
        // Complete address: fires.
        let actions = suggest_actions(&ctx(
            "new customer Jamie Rivera, 123 Main St, Austin, TX 78701, 512-555-0134",
        ));
        let contact = actions
            .iter()
            .find(|a| a.kind() == ActionKind::CreateContact)
            .expect("contact candidate");
        match &contact.payload {
            ActionPayload::CreateContact { name, address, phone, .. } => {
                assert_eq!(name, "Jamie Rivera");
                assert_eq!(address.region, "TX");
                assert_eq!(phone.as_deref(), Some("+15125550134"));
            }
            other => panic!("expected CreateContact, got {other:?}"),
        }

        // Missing region/zip: no partial contact, ever.
        let actions = suggest_actions(&ctx("new customer Jamie Rivera, 123 Main St, Austin"));
        assert!(actions.iter().all(|a| a.kind() != ActionKind::CreateContact));
    }

    #[test]
    fn test_reminder_requires_explicit_time() {
        assert!(suggest_actions(&ctx("remind me about the Hendersons")).is_empty());

        let actions = suggest_actions(&ctx("remind me friday morning to call the Hendersons"));
        let reminder = actions
            .iter()
            .find(|a| a.kind() == ActionKind::CreateReminder)
            .expect("reminder candidate");
        match &reminder.payload {
            ActionPayload::CreateReminder { remind_on, start_hour, .. } => {
                // 2024-06-03 is a Monday; friday resolves to 2024-06-07.
                assert_eq!(*remind_on, NaiveDate::from_ymd_opt(2024, 6, 7).unwrap());
                assert_eq!(*start_hour, Some(8));
            }
            other => panic!("expected CreateReminder, got {other:?}"),
        }
    }

    #[test]
    fn test_reschedule_requires_uuid_in_message() {
        let actions = suggest_actions(&ctx("reschedule their appointment to tuesday"));
        assert!(actions.is_empty());

        let actions = suggest_actions(&ctx(
            "reschedule 7f9c24e5-2b31-4f4c-9a5e-3d1b2c4d5e6f to tuesday",
        ));
        let resched = actions
            .iter()
            .find(|a| a.kind() == ActionKind::RescheduleAppointment)
            .expect("reschedule candidate");
        match &resched.payload {
            ActionPayload::RescheduleAppointment { requested_day, .. } => {
                assert_eq!(*requested_day, NaiveDate::from_ymd_opt(2024, 6, 4));
            }
            other => panic!("expected Reschedule, got {other:?}"),
        }
    }

    #[test]
    fn test_booking_synthesized_from_precomputed_suggestions() {
        let sugg = suggestions();
        let mut c = ctx("book them in, they agreed to $450");
        c.slot_suggestions = Some(&sugg);
        let actions = suggest_actions(&c);
        let booking = actions
            .iter()
            .find(|a| a.kind() == ActionKind::BookAppointment)
            .expect("booking candidate");
        match &booking.payload {
            ActionPayload::BookAppointment { quoted_total_cents, start_at, .. } => {
                assert_eq!(*quoted_total_cents, Some(45000));
                assert_eq!(
                    *start_at,
                    "2024-06-05T14:00:00Z".parse::<DateTime<Utc>>().unwrap()
                );
            }
            other => panic!("expected BookAppointment, got {other:?}"),
        }

        // No precomputed suggestions, no booking candidate.
        let actions = suggest_actions(&ctx("book them in"));
        assert!(actions.iter().all(|a| a.kind() != ActionKind::BookAppointment));
    }

    #[test]
    fn test_send_text_needs_recipient_and_body() {
        let actions = suggest_actions(&ctx(
            "text 512-555-0134 saying we're running 20 minutes late",
        ));
        let text = actions
            .iter()
            .find(|a| a.kind() == ActionKind::SendText)
            .expect("send-text candidate");
        match &text.payload {
            ActionPayload::SendText { to, body } => {
                assert_eq!(to, "+15125550134");
                assert_eq!(body, "we're running 20 minutes late");
            }
            other => panic!("expected SendText, got {other:?}"),
        }

        // No number anywhere: omitted.
        let actions = suggest_actions(&ctx("text them saying hello"));
        assert!(actions.iter().all(|a| a.kind() != ActionKind::SendText));
    }

    #[test]
    fn test_contact_note_from_prefix() {
        let actions = suggest_actions(&known_ctx("note: gate code is 4411"));
        let note = actions
            .iter()
            .find(|a| a.kind() == ActionKind::AddContactNote)
            .expect("note candidate");
        match &note.payload {
            ActionPayload::AddContactNote { note, .. } => {
                assert_eq!(note, "gate code is 4411");
            }
            other => panic!("expected AddContactNote, got {other:?}"),
        }
    }

    #[test]
    fn test_cap_and_priority_order() {
        // Fires quote, task, reminder, and contact-note; cap keeps the top
        // three in priority order.
        let sugg = suggestions();
        let mut c = known_ctx(
            "add a task for the quote on junk hauling, follow up friday, note: call first",
        );
        c.slot_suggestions = Some(&sugg);
        let actions = suggest_actions(&c);
        assert_eq!(actions.len(), MAX_CANDIDATES);
        assert_eq!(actions[0].kind(), ActionKind::CreateQuote);
        assert_eq!(actions[1].kind(), ActionKind::CreateTask);
        assert_eq!(actions[2].kind(), ActionKind::CreateReminder);
    }

    #[test]
    fn test_one_candidate_per_kind() {
        let actions = suggest_actions(&known_ctx("quote quote quote estimate price for lawn"));
        let quote_count = actions
            .iter()
            .filter(|a| a.kind() == ActionKind::CreateQuote)
            .count();
        assert_eq!(quote_count, 1);
    }
}
