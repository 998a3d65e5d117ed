pub mod config;
pub mod design_api;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod routes;

pub use config::{KeySource, ServerConfig};
pub use error::ApiError;
pub use llm::{CompletionProvider, CompletionRequest, LlmError, OpenAiCompatClient};
pub use routes::{AppState, router};

use std::sync::Arc;

/// Application state for `config`: the real upstream client, plus save
/// forwarding when a forward URL is configured.
pub fn app_state(config: &ServerConfig) -> AppState {
    let provider = Arc::new(OpenAiCompatClient::new(config.llm.clone()));
    let state = AppState::new(provider);
    match &config.save_forward_url {
        Some(url) => state.with_save_forward(url.clone()),
        None => state,
    }
}

/// Bind `config.addr` and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let app = router(app_state(&config));
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("scenebridge listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
