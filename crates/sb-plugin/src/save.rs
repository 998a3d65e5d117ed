//! Posting serialized scenes to the save-scene endpoint.

use async_trait::async_trait;
use sb_core::model::Node;
use serde::Serialize;

pub const DEFAULT_SAVE_ENDPOINT: &str = "http://localhost:8787/save-scene";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveConfig {
    pub endpoint: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SAVE_ENDPOINT.to_string(),
        }
    }
}

/// Body of a save request: `{ "scene": [...] }`.
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a> {
    pub scene: &'a [Node],
}

/// What the endpoint answered. The body is kept verbatim and not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Destination for saved scenes.
#[async_trait]
pub trait SceneSink: Send + Sync {
    async fn save(&self, scene: &[Node]) -> Result<SaveResponse, SaveError>;
}

/// Sends scenes to an HTTP endpoint as JSON.
#[derive(Debug, Clone)]
pub struct HttpSceneSink {
    client: reqwest::Client,
    config: SaveConfig,
}

impl HttpSceneSink {
    pub fn new(config: SaveConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl Default for HttpSceneSink {
    fn default() -> Self {
        Self::new(SaveConfig::default())
    }
}

#[async_trait]
impl SceneSink for HttpSceneSink {
    async fn save(&self, scene: &[Node]) -> Result<SaveResponse, SaveError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&SaveRequest { scene })
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::info!("save-scene answered {status}: {body}");
        Ok(SaveResponse { status, body })
    }
}
