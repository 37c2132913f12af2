use std::env;

use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// HMAC key for the client-held conversation token.
    pub session_secret: String,
    pub admin_token: String,
    pub scheduler_url: String,
    pub scheduler_api_key: String,
    pub crm_url: String,
    pub crm_api_key: String,
    /// Empty means no classifier; enrichment is skipped entirely.
    pub classifier_url: String,
    pub classifier_api_key: String,
    /// Whole-hour offset of the business time zone from UTC.
    pub tz_offset_hours: i32,
    pub default_job_minutes: i64,
    /// Surfaced in the voice-channel fallback message.
    pub business_phone: String,
    pub lead_source: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            scheduler_url: env::var("SCHEDULER_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            scheduler_api_key: env::var("SCHEDULER_API_KEY").unwrap_or_default(),
            crm_url: env::var("CRM_URL").unwrap_or_else(|_| "http://localhost:8082".to_string()),
            crm_api_key: env::var("CRM_API_KEY").unwrap_or_default(),
            classifier_url: env::var("CLASSIFIER_URL").unwrap_or_default(),
            classifier_api_key: env::var("CLASSIFIER_API_KEY").unwrap_or_default(),
            tz_offset_hours: env::var("TZ_OFFSET_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(-5),
            default_job_minutes: env::var("DEFAULT_JOB_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            business_phone: env::var("BUSINESS_PHONE").unwrap_or_default(),
            lead_source: env::var("LEAD_SOURCE").unwrap_or_else(|_| "web_chat".to_string()),
        }
    }

    pub fn business_tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.tz_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}
