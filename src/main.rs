use std::sync::Arc;

use feeling_indicator::config::AppConfig;
use feeling_indicator::llm::LlmClient;
use feeling_indicator::routes;
use feeling_indicator::services::settings::JsonFileSettings;
use feeling_indicator::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let settings = JsonFileSettings::open(&config.settings_path).await?;
    tracing::info!(path = %settings.path().display(), "settings store opened");

    let llm = LlmClient::from_config(&config.llm)?;
    tracing::info!(model = llm.model(), base_url = %config.llm.base_url, "LLM client initialized");

    let state = AppState::new(Arc::new(settings), Arc::new(llm), config.analysis);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "feeling-indicator listening");
    axum::serve(listener, app).await?;
    Ok(())
}
