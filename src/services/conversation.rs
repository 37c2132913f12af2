//! Booking conversation state machine. Advances one user turn at a time,
//! collecting name → address → phone in strict order, then negotiates a time
//! slot with the scheduling service under hold-then-confirm.
//!
//! The record is immutable-in, immutable-out: every entry point takes the
//! prior state and returns the next one (or `None` when the conversation is
//! terminal), never mutating across await points anything the caller holds.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{
    BookingScope, ConversationRecord, HoldRef, Phase, Slot, SuggestCriteria, MAX_OFFERED_SLOTS,
};
use crate::services::extract::{self, PreferenceSignal};
use crate::services::preference;
use crate::services::scheduling::SlotConflict;
use crate::state::AppState;

/// What the presenting layer should say, plus the structured directive it
/// can render its own way. Prose generation proper is not this engine's job;
/// the canned text is a serviceable default.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub directive: ReplyDirective,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyDirective {
    CancelAck,
    AskName,
    AskAddress,
    AskPhone,
    OfferSlots { slots: Vec<Slot>, window_missed: bool },
    PickFromOffered { slots: Vec<Slot> },
    NoAvailability,
    ResendAddress,
    TryAgainLater,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// Terminal; the conversation record is discarded.
    Confirmed {
        appointment_id: String,
        message: String,
    },
    /// Selection was not one of the offered slots; record discarded so the
    /// user restarts cleanly instead of silently no-op'ing.
    Conflict { message: String },
    /// Booking did not happen; record survives with a retry prompt.
    Retry { message: String },
    /// Hold-phase conflict triggered the single automatic re-suggest.
    Refreshed { slots: Vec<Slot>, message: String },
}

const CANCEL_PHRASES: &[&str] = &["cancel", "never mind", "nevermind", "start over"];

fn is_cancel(message: &str) -> bool {
    let lower = message.to_lowercase();
    CANCEL_PHRASES.iter().any(|p| lower.contains(p))
}

/// One user turn. Cancel always wins; otherwise extract, merge, and either
/// ask for the next missing field or negotiate slots.
pub async fn process_turn(
    state: &Arc<AppState>,
    prior: Option<ConversationRecord>,
    message: &str,
) -> (TurnReply, Option<ConversationRecord>) {
    let now = Utc::now();
    let msg = message.trim();
    let mut rec = prior.unwrap_or_else(|| ConversationRecord::new(now));

    tracing::info!(phase = rec.phase.as_str(), "processing chat turn");

    if is_cancel(msg) {
        return (render(ReplyDirective::CancelAck, &rec, state), None);
    }

    let tz = state.config.business_tz();
    let today = now.with_timezone(&tz).date_naive();
    let mut pref_changed = false;
    match extract::extract_time_preference(msg, today) {
        PreferenceSignal::Clear => {
            rec.time_preference = None;
            pref_changed = true;
        }
        PreferenceSignal::Set(new_pref) => {
            match rec.time_preference.as_mut() {
                Some(existing) => existing.merge(new_pref),
                None => rec.time_preference = Some(new_pref),
            }
            pref_changed = true;
        }
        PreferenceSignal::None => {}
    }

    // First non-empty value wins; later turns never overwrite.
    if rec.email.is_none() {
        rec.email = extract::extract_email(msg);
    }
    if rec.phone.is_none() {
        rec.phone = extract::extract_phone(msg);
    }
    if rec.contact_name.is_none() {
        if let Some(name) = extract::extract_name(msg) {
            rec.contact_name = Some(name);
        } else if rec.phase == Phase::AwaitingName && extract::is_plausible_name(msg) {
            rec.contact_name = Some(msg.to_string());
        }
    }
    // Address is overwritten wholesale whenever a complete one appears.
    if let Some(addr) = extract::extract_address(msg) {
        rec.address = Some(addr);
    }

    rec.touch(now);

    // Strict collection order. Phone must never be skipped in favor of slots.
    if rec.contact_name.is_none() {
        rec.phase = Phase::AwaitingName;
        let reply = render(ReplyDirective::AskName, &rec, state);
        return (reply, Some(rec));
    }
    if rec.address.is_none() {
        rec.phase = Phase::AwaitingAddress;
        let reply = render(ReplyDirective::AskAddress, &rec, state);
        return (reply, Some(rec));
    }
    if rec.phone.is_none() {
        rec.phase = Phase::AwaitingPhone;
        let reply = render(ReplyDirective::AskPhone, &rec, state);
        return (reply, Some(rec));
    }

    // Already offering and nothing about timing changed: remind, don't
    // re-fetch.
    if rec.phase == Phase::Suggesting && !pref_changed && !rec.offered_slots.is_empty() {
        let slots = rec.offered_slots.clone();
        let reply = render(ReplyDirective::PickFromOffered { slots }, &rec, state);
        return (reply, Some(rec));
    }

    if !rec.has_identifiers() {
        let Some(address) = rec.address.clone() else {
            rec.phase = Phase::AwaitingAddress;
            let reply = render(ReplyDirective::AskAddress, &rec, state);
            return (reply, Some(rec));
        };
        let name = rec.contact_name.clone().unwrap_or_default();
        match state
            .crm
            .create_contact_and_property(
                &name,
                rec.phone.as_deref(),
                rec.email.as_deref(),
                &address,
                &state.config.lead_source,
            )
            .await
        {
            Ok(ids) => {
                rec.contact_id = Some(ids.contact_id);
                rec.property_id = Some(ids.property_id);
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact creation failed, asking for address again");
                rec.address = None;
                rec.phase = Phase::AwaitingAddress;
                let reply = render(ReplyDirective::ResendAddress, &rec, state);
                return (reply, Some(rec));
            }
        }
    }

    match fetch_offers(state, &rec).await {
        Ok((slots, window_missed)) if !slots.is_empty() => {
            rec.offered_slots = slots.clone();
            rec.phase = Phase::Suggesting;
            let reply = render(
                ReplyDirective::OfferSlots {
                    slots,
                    window_missed,
                },
                &rec,
                state,
            );
            (reply, Some(rec))
        }
        Ok(_) => {
            rec.offered_slots.clear();
            rec.phase = Phase::Idle;
            let reply = render(ReplyDirective::NoAvailability, &rec, state);
            (reply, Some(rec))
        }
        Err(e) => {
            tracing::error!(error = %e, "slot suggestion failed");
            // Never leave the record claiming `suggesting` without offers.
            rec.offered_slots.clear();
            rec.phase = Phase::Idle;
            let reply = render(ReplyDirective::TryAgainLater, &rec, state);
            (reply, Some(rec))
        }
    }
}

/// Suggest scoped to address + preference, filtered locally. Returns the
/// slots to offer (capped) and whether the requested window came back empty
/// and we fell back to true availability.
async fn fetch_offers(
    state: &Arc<AppState>,
    rec: &ConversationRecord,
) -> anyhow::Result<(Vec<Slot>, bool)> {
    let address = rec
        .address
        .clone()
        .ok_or_else(|| anyhow::anyhow!("suggest requested without an address"))?;

    let hour_window = rec
        .time_preference
        .as_ref()
        .and_then(|p| p.start_hour.zip(p.end_hour));

    let response = state
        .scheduler
        .suggest(&SuggestCriteria {
            duration_minutes: state.config.default_job_minutes,
            address,
            hour_window,
        })
        .await?;

    let all: Vec<Slot> = response.slots.iter().map(|s| s.window()).collect();

    let tz = state.config.business_tz();
    let (mut slots, window_missed) = match rec.time_preference.as_ref() {
        Some(pref) if !pref.is_empty() => {
            let filtered = preference::filter_slots(&all, pref, tz);
            if filtered.is_empty() && !all.is_empty() {
                (all, true)
            } else {
                (filtered, false)
            }
        }
        _ => (all, false),
    };
    slots.truncate(MAX_OFFERED_SLOTS);
    Ok((slots, window_missed))
}

/// Explicit slot selection. The chosen slot must be an exact member of the
/// current offer; anything else is a conflict and the record is discarded.
pub async fn select_slot(
    state: &Arc<AppState>,
    prior: Option<ConversationRecord>,
    chosen: Slot,
) -> (SelectionOutcome, Option<ConversationRecord>) {
    let now = Utc::now();

    let Some(mut rec) = prior else {
        return (
            SelectionOutcome::Conflict {
                message: "That selection is no longer valid. Let's start over — what's your name?"
                    .to_string(),
            },
            None,
        );
    };

    if rec.phase != Phase::Suggesting || !rec.offered_slots.contains(&chosen) {
        tracing::warn!("slot selection outside the current offer, discarding conversation");
        return (
            SelectionOutcome::Conflict {
                message: "That time isn't on the current list, so I've reset things to be safe. Message us again to restart."
                    .to_string(),
            },
            None,
        );
    }

    let (Some(contact_id), Some(property_id)) = (rec.contact_id.clone(), rec.property_id.clone())
    else {
        tracing::warn!("suggesting phase without contact identifiers, discarding conversation");
        return (
            SelectionOutcome::Conflict {
                message: "Something went wrong with your details. Message us again to restart."
                    .to_string(),
            },
            None,
        );
    };
    let scope = BookingScope {
        contact_id,
        property_id,
    };

    // Best-effort hold. A live hold on the same slot is reused; a hold on a
    // different slot is superseded. Failure to hold never blocks booking.
    let mut hold_id = rec
        .hold
        .as_ref()
        .filter(|h| h.slot_start == chosen.start_at && h.expires_at > now)
        .map(|h| h.hold_id.clone());

    if hold_id.is_none() {
        rec.hold = None;
        match state.scheduler.hold(chosen.start_at, &scope).await {
            Ok(Ok(hold)) => {
                hold_id = Some(hold.hold_id.clone());
                rec.hold = Some(HoldRef {
                    hold_id: hold.hold_id,
                    slot_start: chosen.start_at,
                    expires_at: hold.expires_at,
                });
            }
            Ok(Err(conflict)) if conflict.triggers_resuggest() => {
                return resuggest_after_conflict(state, rec, conflict, now).await;
            }
            Ok(Err(SlotConflict::OutsideWindow)) => {
                rec.offered_slots.retain(|s| *s != chosen);
                // Removing the last offer must not leave the record claiming
                // an active suggestion.
                if rec.offered_slots.is_empty() {
                    rec.phase = Phase::Idle;
                }
                rec.touch(now);
                return (
                    SelectionOutcome::Retry {
                        message: SlotConflict::OutsideWindow.user_message().to_string(),
                    },
                    Some(rec),
                );
            }
            Ok(Err(other)) => {
                tracing::warn!(conflict = ?other, "unexpected hold conflict, booking unheld");
            }
            Err(e) => {
                tracing::warn!(error = %e, "hold attempt failed, booking unheld");
            }
        }
    }

    match state
        .scheduler
        .book(chosen.start_at, &scope, hold_id.as_deref())
        .await
    {
        Ok(Ok(confirmation)) => {
            tracing::info!(
                appointment_id = %confirmation.appointment_id,
                "booking confirmed"
            );
            let when = format_slot_time(confirmation.start_at, state.config.business_tz());
            (
                SelectionOutcome::Confirmed {
                    appointment_id: confirmation.appointment_id,
                    message: format!("You're booked for {when}. See you then!"),
                },
                None,
            )
        }
        Ok(Err(conflict)) => {
            // Stale holds are cleared before any retry prompt goes out.
            if conflict.invalidates_hold() {
                rec.hold = None;
            }
            if conflict.triggers_resuggest() {
                rec.hold = None;
                rec.offered_slots.clear();
                rec.phase = Phase::Idle;
            }
            rec.touch(now);
            (
                SelectionOutcome::Retry {
                    message: conflict.user_message().to_string(),
                },
                Some(rec),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "booking call failed");
            rec.touch(now);
            (
                SelectionOutcome::Retry {
                    message: "We couldn't reach the scheduler just now. Please try that time again in a moment."
                        .to_string(),
                },
                Some(rec),
            )
        }
    }
}

/// The one automatic refresh after a hold-phase slot_full/day_full.
async fn resuggest_after_conflict(
    state: &Arc<AppState>,
    mut rec: ConversationRecord,
    conflict: SlotConflict,
    now: DateTime<Utc>,
) -> (SelectionOutcome, Option<ConversationRecord>) {
    rec.hold = None;
    rec.offered_slots.clear();
    rec.touch(now);

    match fetch_offers(state, &rec).await {
        Ok((slots, _)) if !slots.is_empty() => {
            rec.offered_slots = slots.clone();
            rec.phase = Phase::Suggesting;
            let listing = format_slot_list(&slots, state.config.business_tz());
            (
                SelectionOutcome::Refreshed {
                    slots,
                    message: format!("{}\n{listing}", conflict.user_message()),
                },
                Some(rec),
            )
        }
        Ok(_) => {
            rec.phase = Phase::Idle;
            (
                SelectionOutcome::Retry {
                    message: format!(
                        "{} Nothing else is open right now — check back with us shortly.",
                        conflict.user_message()
                    ),
                },
                Some(rec),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "re-suggest after conflict failed");
            rec.phase = Phase::Idle;
            (
                SelectionOutcome::Retry {
                    message: SlotConflict::ServerError.user_message().to_string(),
                },
                Some(rec),
            )
        }
    }
}

fn format_slot_time(start: DateTime<Utc>, tz: FixedOffset) -> String {
    start
        .with_timezone(&tz)
        .format("%A, %B %-d at %-I:%M %p")
        .to_string()
}

fn format_slot_list(slots: &[Slot], tz: FixedOffset) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, format_slot_time(s.start_at, tz)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(directive: ReplyDirective, rec: &ConversationRecord, state: &Arc<AppState>) -> TurnReply {
    let tz = state.config.business_tz();
    let first = rec.first_name();
    let greeting = first.map(|n| format!(", {n}")).unwrap_or_default();

    let message = match &directive {
        ReplyDirective::CancelAck => {
            "No problem — I've cleared everything out. Message us any time to start fresh."
                .to_string()
        }
        ReplyDirective::AskName => {
            "Happy to get you on the schedule! What's your name?".to_string()
        }
        ReplyDirective::AskAddress => format!(
            "Thanks{greeting}! What's the service address? Street, city, state and zip works best."
        ),
        ReplyDirective::AskPhone => format!(
            "Got it{greeting}. What's the best phone number in case the crew needs to reach you?"
        ),
        ReplyDirective::OfferSlots {
            slots,
            window_missed,
        } => {
            let listing = format_slot_list(slots, tz);
            if *window_missed {
                format!(
                    "We didn't have anything open in your requested window, but here's what is available:\n{listing}\nReply with the time that works."
                )
            } else {
                let scope = rec
                    .time_preference
                    .as_ref()
                    .and_then(|p| p.label.clone())
                    .map(|l| format!(" for {l}"))
                    .unwrap_or_default();
                format!("Here's what we have open{scope}:\n{listing}\nReply with the time that works.")
            }
        }
        ReplyDirective::PickFromOffered { slots } => {
            let listing = format_slot_list(slots, tz);
            format!("Just pick one of the times I sent over:\n{listing}")
        }
        ReplyDirective::NoAvailability => {
            if state.config.business_phone.is_empty() {
                "I'm sorry — we don't have any openings right now. Give us a call and we'll find something that works.".to_string()
            } else {
                format!(
                    "I'm sorry — we don't have any openings right now. Call us at {} and we'll find something that works.",
                    state.config.business_phone
                )
            }
        }
        ReplyDirective::ResendAddress => {
            "I had trouble saving that address on our end. Could you send the service address one more time?"
                .to_string()
        }
        ReplyDirective::TryAgainLater => {
            "Sorry, I'm having trouble checking the schedule right now. Please try again in a moment."
                .to_string()
        }
    };

    TurnReply { directive, message }
}
