//! Server configuration, read from the process environment.
//!
//! Addresses and endpoints are read once at startup. API keys are not: a
//! [`KeySource::Env`] is resolved on every call, so rotating a key does not
//! need a restart and a missing key is reported per request.

use std::net::SocketAddr;

pub const ADDR_VAR: &str = "SCENEBRIDGE_ADDR";
pub const SAVE_FORWARD_VAR: &str = "SCENEBRIDGE_SAVE_FORWARD_URL";
pub const LLM_URL_VAR: &str = "SCENEBRIDGE_LLM_URL";
pub const LLM_MODEL_VAR: &str = "SCENEBRIDGE_LLM_MODEL";
pub const LLM_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DESIGN_API_URL_VAR: &str = "SCENEBRIDGE_DESIGN_API_URL";
pub const DESIGN_TOKEN_VAR: &str = "FIGMA_API_KEY";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_LLM_URL: &str = "https://api.openai.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DESIGN_API_URL: &str = "https://api.figma.com";

/// Fixed sampling parameters for every completion.
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}=`{value}` is not a socket address: {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Where an API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Read the named environment variable at call time.
    Env(String),
    /// A value passed in explicitly.
    Static(Option<String>),
}

impl KeySource {
    /// The key, if one is set and not blank.
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            KeySource::Env(var) => std::env::var(var).ok(),
            KeySource::Static(key) => key.clone(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub key: KeySource,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            key: KeySource::Env(LLM_KEY_VAR.to_string()),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or(LLM_URL_VAR, DEFAULT_LLM_URL),
            model: env_or(LLM_MODEL_VAR, DEFAULT_LLM_MODEL),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignApiConfig {
    pub base_url: String,
    pub token: KeySource,
}

impl Default for DesignApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DESIGN_API_URL.to_string(),
            token: KeySource::Env(DESIGN_TOKEN_VAR.to_string()),
        }
    }
}

impl DesignApiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or(DESIGN_API_URL_VAR, DEFAULT_DESIGN_API_URL),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Where `/save-scene` forwards scenes; logged only when unset.
    pub save_forward_url: Option<String>,
    pub llm: LlmConfig,
    pub design_api: DesignApiConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = env_or(ADDR_VAR, DEFAULT_ADDR);
        let addr = value.parse().map_err(|source| ConfigError::InvalidAddr {
            var: ADDR_VAR,
            value: value.clone(),
            source,
        })?;
        Ok(Self {
            addr,
            save_forward_url: std::env::var(SAVE_FORWARD_VAR)
                .ok()
                .filter(|url| !url.is_empty()),
            llm: LlmConfig::from_env(),
            design_api: DesignApiConfig::from_env(),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_static_key_counts_as_missing() {
        assert_eq!(KeySource::Static(None).resolve(), None);
        assert_eq!(KeySource::Static(Some("  ".into())).resolve(), None);
        assert_eq!(
            KeySource::Static(Some("sk-test".into())).resolve(),
            Some("sk-test".to_string())
        );
    }

    #[test]
    fn unset_env_key_is_missing() {
        let source = KeySource::Env("SCENEBRIDGE_TEST_KEY_THAT_IS_NEVER_SET".into());
        assert_eq!(source.resolve(), None);
    }

    #[test]
    fn defaults_use_fixed_sampling() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.key, KeySource::Env("OPENAI_API_KEY".into()));
    }
}
