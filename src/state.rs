use crate::config::AppConfig;
use crate::services::ai::IntentClassifier;
use crate::services::crm::CrmProvider;
use crate::services::scheduling::SchedulingProvider;

pub struct AppState {
    pub config: AppConfig,
    pub scheduler: Box<dyn SchedulingProvider>,
    pub crm: Box<dyn CrmProvider>,
    pub classifier: Box<dyn IntentClassifier>,
}
