pub mod ai;
pub mod conversation;
pub mod crm;
pub mod extract;
pub mod preference;
pub mod scheduling;
pub mod session;
pub mod suggestions;
