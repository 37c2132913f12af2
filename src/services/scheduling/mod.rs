pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{BookingConfirmation, BookingScope, Hold, SuggestCriteria, SuggestResponse};

/// Classified conflict responses from the scheduling service. Transport and
/// 5xx failures are *not* conflicts; they surface as `anyhow` errors and
/// degrade to a generic retry prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotConflict {
    SlotFull,
    DayFull,
    OutsideWindow,
    HoldExpired,
    HoldNotFound,
    HoldMismatch,
    ServerError,
}

impl SlotConflict {
    pub fn from_code(code: &str) -> Self {
        match code {
            "slot_full" => SlotConflict::SlotFull,
            "day_full" => SlotConflict::DayFull,
            "outside_window" => SlotConflict::OutsideWindow,
            "hold_expired" => SlotConflict::HoldExpired,
            "hold_not_found" => SlotConflict::HoldNotFound,
            "hold_mismatch" => SlotConflict::HoldMismatch,
            _ => SlotConflict::ServerError,
        }
    }

    /// slot_full/day_full mean the window evaporated; the engine refreshes
    /// suggestions exactly once automatically.
    pub fn triggers_resuggest(&self) -> bool {
        matches!(self, SlotConflict::SlotFull | SlotConflict::DayFull)
    }

    /// Any hold-related conflict invalidates the client-held hold id. A
    /// stale hold must never be sent on a later attempt.
    pub fn invalidates_hold(&self) -> bool {
        matches!(
            self,
            SlotConflict::HoldExpired | SlotConflict::HoldNotFound | SlotConflict::HoldMismatch
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            SlotConflict::SlotFull => {
                "Sorry, that time was just taken. Here are the latest openings."
            }
            SlotConflict::DayFull => {
                "That day filled up. Here are the next available times."
            }
            SlotConflict::OutsideWindow => {
                "That time falls outside our service hours. Please pick another of the offered times."
            }
            SlotConflict::HoldExpired | SlotConflict::HoldNotFound | SlotConflict::HoldMismatch => {
                "Your reservation on that time lapsed. Please pick a time again to confirm."
            }
            SlotConflict::ServerError => {
                "We couldn't complete the booking just now. Please try again in a moment."
            }
        }
    }
}

/// The scheduling service's three operations. `suggest` is advisory and
/// freely retryable; `hold` is a best-effort claim; `book` is the single
/// source of truth and re-validates availability regardless of any hold.
#[async_trait]
pub trait SchedulingProvider: Send + Sync {
    async fn suggest(&self, criteria: &SuggestCriteria) -> anyhow::Result<SuggestResponse>;

    async fn hold(
        &self,
        start_at: chrono::DateTime<chrono::Utc>,
        scope: &BookingScope,
    ) -> anyhow::Result<Result<Hold, SlotConflict>>;

    async fn book(
        &self,
        start_at: chrono::DateTime<chrono::Utc>,
        scope: &BookingScope,
        hold_id: Option<&str>,
    ) -> anyhow::Result<Result<BookingConfirmation, SlotConflict>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(SlotConflict::from_code("slot_full"), SlotConflict::SlotFull);
        assert_eq!(SlotConflict::from_code("hold_mismatch"), SlotConflict::HoldMismatch);
        assert_eq!(SlotConflict::from_code("???"), SlotConflict::ServerError);
    }

    #[test]
    fn test_classification_flags() {
        assert!(SlotConflict::SlotFull.triggers_resuggest());
        assert!(SlotConflict::DayFull.triggers_resuggest());
        assert!(!SlotConflict::OutsideWindow.triggers_resuggest());
        assert!(SlotConflict::HoldExpired.invalidates_hold());
        assert!(SlotConflict::HoldNotFound.invalidates_hold());
        assert!(SlotConflict::HoldMismatch.invalidates_hold());
        assert!(!SlotConflict::SlotFull.invalidates_hold());
    }

    #[test]
    fn test_messages_are_distinct_for_hold_phase_conflicts() {
        let msgs = [
            SlotConflict::SlotFull.user_message(),
            SlotConflict::DayFull.user_message(),
            SlotConflict::OutsideWindow.user_message(),
        ];
        assert_ne!(msgs[0], msgs[1]);
        assert_ne!(msgs[1], msgs[2]);
        assert_ne!(msgs[0], msgs[2]);
    }
}
