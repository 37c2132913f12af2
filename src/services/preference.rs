//! Filters candidate slots against a stored time preference. Pure function;
//! the state machine owns the fallback-to-unfiltered policy.

use chrono::{FixedOffset, Timelike};

use crate::models::{Slot, TimePreference};

/// A slot matches only if every specified dimension matches: day is compared
/// as a calendar date in the business zone, hours as a half-open interval
/// `[start_hour, end_hour)` against the slot's local start hour. An empty
/// preference returns the input unchanged.
pub fn filter_slots(slots: &[Slot], pref: &TimePreference, tz: FixedOffset) -> Vec<Slot> {
    if pref.is_empty() {
        return slots.to_vec();
    }

    slots
        .iter()
        .filter(|slot| {
            let local = slot.start_at.with_timezone(&tz);
            if let Some(day) = pref.day {
                if local.date_naive() != day {
                    return false;
                }
            }
            if let (Some(start), Some(end)) = (pref.start_hour, pref.end_hour) {
                let hour = local.hour() as u8;
                if hour < start || hour >= end {
                    return false;
                }
            }
            true
        })
        .copied()
        .collect()
}
