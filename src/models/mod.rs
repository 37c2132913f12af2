pub mod actions;
pub mod conversation;
pub mod intent;
pub mod scheduling;

pub use actions::{ActionKind, ActionPayload, CandidateAction};
pub use conversation::{
    Address, ConversationRecord, HoldRef, Phase, TimePreference, MAX_OFFERED_SLOTS,
    SESSION_TTL_MINUTES,
};
pub use intent::IntentHint;
pub use scheduling::{
    BookingConfirmation, BookingScope, Hold, Slot, SuggestCriteria, SuggestResponse,
    SuggestedSlot, UpcomingAppointment,
};
