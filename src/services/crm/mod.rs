pub mod http;

use async_trait::async_trait;

use crate::models::{Address, UpcomingAppointment};

/// Identifiers minted downstream when a lead becomes a contact+property pair.
#[derive(Debug, Clone)]
pub struct ContactIds {
    pub contact_id: String,
    pub property_id: String,
}

#[async_trait]
pub trait CrmProvider: Send + Sync {
    /// Creates a contact and its service property in one shot. The engine
    /// only stores the returned ids after this succeeds.
    async fn create_contact_and_property(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: &Address,
        source: &str,
    ) -> anyhow::Result<ContactIds>;

    /// Next scheduled appointment for a contact at a property, if any.
    async fn lookup_upcoming_appointment(
        &self,
        contact_id: &str,
        property_id: &str,
    ) -> anyhow::Result<Option<UpcomingAppointment>>;
}
