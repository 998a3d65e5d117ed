//! Scene generation: prompt → completion → scene.

use crate::llm::{CompletionProvider, CompletionRequest, LlmError};
use sb_core::dsl;
use sb_core::model::{Scene, scene_from_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

const SCENE_FORMAT: &str = "Reply with a JSON array of nodes and nothing else. \
Each node is {\"name\": string, \"type\": \"RECTANGLE\" | \"ELLIPSE\" | \"TEXT\" | \"GROUP\" | \"FRAME\", ...}. \
Shapes carry \"node\": {\"position\": {\"x\", \"y\"}, \"color\": {\"r\", \"g\", \"b\"} with components in 0..1, \
\"width\", \"height\", optional \"opacity\", \"cornerRadius\", \"strokeWeight\", \"dropShadow\"}. \
Text carries \"text\": {\"content\", optional \"fontSize\", \"color\", \"position\"}. \
Groups and frames carry \"node\": {\"children\": [...]}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    /// Describe a new scene from free text.
    Primary,
    /// Modify a supplied scene.
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown prompt type `{0}`")]
pub struct UnknownPromptType(pub String);

impl FromStr for PromptType {
    type Err = UnknownPromptType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(PromptType::Primary),
            "edit" => Ok(PromptType::Edit),
            other => Err(UnknownPromptType(other.to_string())),
        }
    }
}

impl PromptType {
    pub fn instruction(self) -> String {
        let task = match self {
            PromptType::Primary => {
                "You turn descriptions of user interfaces into scenes for a design tool."
            }
            PromptType::Edit => {
                "You edit scenes for a design tool. Apply the requested change to the \
                 current scene and return the whole updated scene."
            }
        };
        format!("{task} {SCENE_FORMAT}")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub scene: Option<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub prompt_type: PromptType,
    pub completion: String,
    /// `None` when the completion held no usable scene.
    pub scene: Option<Scene>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("`prompt` is required")]
    EmptyPrompt,

    #[error("an edit needs the current `scene`")]
    MissingScene,

    #[error("could not encode the current scene: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Clone)]
pub struct GenerationPipeline {
    provider: Arc<dyn CompletionProvider>,
}

impl GenerationPipeline {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn run(
        &self,
        prompt_type: PromptType,
        request: &ConvertRequest,
    ) -> Result<ConvertResponse, PipelineError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        let user = match prompt_type {
            PromptType::Primary => prompt.to_string(),
            PromptType::Edit => {
                let scene = request.scene.as_ref().ok_or(PipelineError::MissingScene)?;
                format!(
                    "{prompt}\n\nCurrent scene:\n{}",
                    serde_json::to_string(scene)?
                )
            }
        };

        let completion = self
            .provider
            .complete(CompletionRequest::new(prompt_type.instruction(), user))
            .await?;
        let scene = coerce_scene(&completion);
        match &scene {
            Some(scene) => log::debug!("completion held a {}-node scene", scene.len()),
            None => log::warn!("completion held no usable scene"),
        }

        Ok(ConvertResponse {
            prompt_type,
            completion,
            scene,
        })
    }
}

/// Pull the first scene out of free-form model output.
///
/// Tries each `[` or `{` in turn as the start of a JSON value, so prose and
/// code fences around the payload are skipped. A value is accepted as a full
/// scene first, then as the compact DSL form. Empty lists are skipped.
pub fn coerce_scene(text: &str) -> Option<Scene> {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '[' | '{'))
        .find_map(|(start, _)| {
            let value = serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()?
                .ok()?;
            scene_from_value(value.clone())
                .ok()
                .or_else(|| {
                    dsl::nodes_from_value(value)
                        .ok()
                        .and_then(|nodes| dsl::to_scene(&nodes).ok())
                })
                .filter(|scene| !scene.is_empty())
        })
}
