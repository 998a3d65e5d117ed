//! Client for the design tool's file API.

use crate::config::DesignApiConfig;
use sb_core::schema::{DesignFile, SchemaError};
use serde_json::Value;

const TOKEN_HEADER: &str = "X-Figma-Token";

#[derive(Debug, thiserror::Error)]
pub enum DesignApiError {
    #[error("no design API token configured")]
    MissingToken,

    #[error("design API answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone)]
pub struct DesignApiClient {
    http: reqwest::Client,
    config: DesignApiConfig,
}

impl DesignApiClient {
    pub fn new(config: DesignApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn file_url(&self, file_key: &str) -> String {
        format!(
            "{}/v1/files/{file_key}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Fetch a file as raw JSON, without validating it.
    pub async fn fetch_raw(&self, file_key: &str) -> Result<Value, DesignApiError> {
        let token = self
            .config
            .token
            .resolve()
            .ok_or(DesignApiError::MissingToken)?;

        let url = self.file_url(file_key);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DesignApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch a file and decode it against the unified schema.
    pub async fn fetch_file(&self, file_key: &str) -> Result<DesignFile, DesignApiError> {
        let value = self.fetch_raw(file_key).await?;
        Ok(DesignFile::from_value(value)?)
    }
}
