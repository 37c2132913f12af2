use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ContactIds, CrmProvider};
use crate::models::{Address, UpcomingAppointment};

pub struct HttpCrmProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpCrmProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    contact_id: String,
    property_id: String,
}

#[async_trait]
impl CrmProvider for HttpCrmProvider {
    async fn create_contact_and_property(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: &Address,
        source: &str,
    ) -> anyhow::Result<ContactIds> {
        let resp: CreateResponse = self
            .client
            .post(format!("{}/v1/contacts", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "name": name,
                "phone": phone,
                "email": email,
                "address": address,
                "source": source,
            }))
            .send()
            .await
            .context("failed to call contact creation")?
            .error_for_status()
            .context("contact creation returned error")?
            .json()
            .await
            .context("failed to parse contact creation response")?;

        Ok(ContactIds {
            contact_id: resp.contact_id,
            property_id: resp.property_id,
        })
    }

    async fn lookup_upcoming_appointment(
        &self,
        contact_id: &str,
        property_id: &str,
    ) -> anyhow::Result<Option<UpcomingAppointment>> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/contacts/{contact_id}/properties/{property_id}/upcoming",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("failed to call upcoming appointment lookup")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .context("appointment lookup returned error")?;

        Ok(resp
            .json()
            .await
            .context("failed to parse upcoming appointment")?)
    }
}
