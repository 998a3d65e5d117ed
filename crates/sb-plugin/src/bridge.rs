//! Message bridge between the plugin UI and the host document.
//!
//! The UI posts `{type: "render", json}` to draw a scene and `{type: "save"}`
//! to export the current selection. One message is handled at a time: a
//! message that arrives while another is still being processed is rejected
//! with [`BridgeError::Busy`] instead of interleaving with it.

use crate::save::{SaveError, SaveResponse, SceneSink};
use sb_core::builder::{BuildOptions, build_scene};
use sb_core::error::{BuildError, HostError, ParseError, SerializeError};
use sb_core::host::{Host, HostKind, HostMutation};
use sb_core::id::HostId;
use sb_core::model::parse_scene;
use sb_core::serializer::serialize_selection;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};

/// Name given to the frame that receives a rendered scene.
pub const SCENE_FRAME_NAME: &str = "Scene";

// ─── Messages ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PluginMessage {
    /// Raw scene JSON to parse and draw.
    Render { json: String },
    Save,
    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

impl PluginMessage {
    pub fn from_json(input: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(input).map_err(BridgeError::Message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Processing,
}

#[derive(Debug)]
pub enum Outcome {
    Rendered { frame: HostId },
    Saved { response: SaveResponse },
    Ignored,
    Failed { error: BridgeError },
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("another message is still being processed")]
    Busy,

    #[error("malformed plugin message: {0}")]
    Message(#[source] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("nothing is selected")]
    EmptySelection,

    #[error(transparent)]
    Save(#[from] SaveError),
}

// ─── Bridge ──────────────────────────────────────────────────────────────

/// Resets the bridge to idle when dropped, whichever way processing ends.
struct ProcessingGuard<'a> {
    state: &'a Mutex<BridgeState>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = BridgeState::Idle;
    }
}

pub struct Bridge<H, S> {
    host: H,
    sink: S,
    options: BuildOptions,
    state: Mutex<BridgeState>,
}

impl<H: Host, S: SceneSink> Bridge<H, S> {
    pub fn new(host: H, sink: S) -> Self {
        Self::with_options(host, sink, BuildOptions::default())
    }

    pub fn with_options(host: H, sink: S, options: BuildOptions) -> Self {
        Self {
            host,
            sink,
            options,
            state: Mutex::new(BridgeState::Idle),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<ProcessingGuard<'_>, BridgeError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == BridgeState::Processing {
            return Err(BridgeError::Busy);
        }
        *state = BridgeState::Processing;
        Ok(ProcessingGuard { state: &self.state })
    }

    /// Decode a raw UI message and handle it. A malformed message is reported
    /// like any other failure.
    pub async fn handle_raw(&self, input: &str) -> Result<Outcome, BridgeError> {
        match PluginMessage::from_json(input) {
            Ok(message) => self.handle_message(message).await,
            Err(error) => {
                let _guard = self.begin()?;
                Ok(self.fail(error))
            }
        }
    }

    /// Handle one message. Only [`BridgeError::Busy`] is returned as `Err`;
    /// every other failure is reported to the operator and comes back as
    /// [`Outcome::Failed`].
    pub async fn handle_message(&self, message: PluginMessage) -> Result<Outcome, BridgeError> {
        let _guard = self.begin()?;
        let outcome = match message {
            PluginMessage::Render { json } => match self.render(&json).await {
                Ok(frame) => Outcome::Rendered { frame },
                Err(error) => self.fail(error),
            },
            PluginMessage::Save => match self.save().await {
                Ok(response) => Outcome::Saved { response },
                Err(error) => self.fail(error),
            },
            PluginMessage::Unknown => {
                log::debug!("ignoring plugin message of unknown type");
                Outcome::Ignored
            }
        };
        Ok(outcome)
    }

    fn fail(&self, error: BridgeError) -> Outcome {
        log::error!("plugin message failed: {error}");
        self.host.notify(&format!("Error: {error}"));
        Outcome::Failed { error }
    }

    async fn render(&self, json: &str) -> Result<HostId, BridgeError> {
        // Parse first: malformed input never touches the document.
        let scene = parse_scene(json)?;

        let frame = self.host.create(HostKind::Frame)?;
        let placed = async {
            self.host
                .apply(frame, HostMutation::SetName(SCENE_FRAME_NAME.to_string()))?;
            build_scene(&self.host, &scene, frame, self.options).await?;
            self.host.append_child(self.host.current_page(), frame)?;
            Ok::<_, BridgeError>(())
        }
        .await;

        if let Err(err) = placed {
            if let Err(cleanup) = self.host.remove(frame) {
                log::warn!("could not remove frame {frame} after failed render: {cleanup}");
            }
            return Err(err);
        }

        self.host.scroll_into_view(&[frame]);
        log::info!("rendered {} top-level node(s) into {frame}", scene.len());
        Ok(frame)
    }

    async fn save(&self) -> Result<SaveResponse, BridgeError> {
        let scene = serialize_selection(&self.host)?;
        if scene.is_empty() {
            return Err(BridgeError::EmptySelection);
        }
        log::debug!("saving {} selected node(s)", scene.len());
        Ok(self.sink.save(&scene).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_decode_by_type() {
        assert_eq!(
            PluginMessage::from_json(r#"{"type": "render", "json": "[]"}"#).unwrap(),
            PluginMessage::Render { json: "[]".into() }
        );
        assert_eq!(
            PluginMessage::from_json(r#"{"type": "save"}"#).unwrap(),
            PluginMessage::Save
        );
        assert_eq!(
            PluginMessage::from_json(r#"{"type": "resize", "width": 300}"#).unwrap(),
            PluginMessage::Unknown
        );
    }

    #[test]
    fn render_without_payload_is_malformed() {
        assert!(matches!(
            PluginMessage::from_json(r#"{"type": "render"}"#),
            Err(BridgeError::Message(_))
        ));
    }
}
