use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use doorstep::config::AppConfig;
use doorstep::handlers;
use doorstep::services::ai::http::HttpIntentClassifier;
use doorstep::services::ai::{IntentClassifier, NoopClassifier};
use doorstep::services::crm::http::HttpCrmProvider;
use doorstep::services::scheduling::http::HttpSchedulingProvider;
use doorstep::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        config.session_secret != "changeme",
        "SESSION_SECRET must be set to a real secret"
    );

    let scheduler = HttpSchedulingProvider::new(
        config.scheduler_url.clone(),
        config.scheduler_api_key.clone(),
    );
    let crm = HttpCrmProvider::new(config.crm_url.clone(), config.crm_api_key.clone());

    let classifier: Box<dyn IntentClassifier> = if config.classifier_url.is_empty() {
        tracing::info!("no classifier configured, running without intent enrichment");
        Box::new(NoopClassifier)
    } else {
        tracing::info!(url = %config.classifier_url, "using HTTP intent classifier");
        Box::new(HttpIntentClassifier::new(
            config.classifier_url.clone(),
            config.classifier_api_key.clone(),
        ))
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        scheduler: Box::new(scheduler),
        crm: Box::new(crm),
        classifier,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/chat/message", post(handlers::chat::chat_message))
        .route("/api/chat/select", post(handlers::chat::select_slot))
        .route("/api/assist/suggest", post(handlers::assist::suggest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
