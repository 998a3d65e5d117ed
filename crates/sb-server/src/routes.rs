//! HTTP routes.
//!
//! Every route is `POST`; any other method gets `405` from the router.

use crate::error::ApiError;
use crate::llm::{CompletionProvider, CompletionRequest, PROMPT_INSTRUCTION};
use crate::pipeline::{ConvertRequest, ConvertResponse, GenerationPipeline, PromptType};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use sb_core::model::{node_count, scene_from_value};
use sb_core::schema::validate;
use sb_plugin::save::{HttpSceneSink, SaveConfig, SceneSink};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
    /// Downstream store for `/save-scene`; scenes are only logged when unset.
    pub save_forward: Option<Arc<dyn SceneSink>>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            save_forward: None,
        }
    }

    pub fn with_save_forward(mut self, url: impl Into<String>) -> Self {
        let sink = HttpSceneSink::new(SaveConfig {
            endpoint: url.into(),
        });
        self.save_forward = Some(Arc::new(sink));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", post(healthcheck))
        .route("/save-scene", post(save_scene))
        .route("/convert/:prompt_type", post(convert))
        .route("/prompt", post(prompt))
        .route("/validate-file", post(validate_file))
        .with_state(state)
}

/// Unwrap a JSON body, turning axum's rejection into a `400`.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn save_scene(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let mut payload = body(payload)?;
    let scene = payload
        .get_mut("scene")
        .map(Value::take)
        .unwrap_or(Value::Null);
    let scene = scene_from_value(scene)?;
    log::info!(
        "save-scene: {} top-level node(s), {} in total",
        scene.len(),
        node_count(&scene)
    );

    let Some(sink) = &state.save_forward else {
        let saved = json!({ "status": "saved", "nodes": node_count(&scene) });
        return Ok(Json(saved).into_response());
    };

    let forwarded = sink.save(&scene).await?;
    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        forwarded.body,
    )
        .into_response())
}

async fn convert(
    State(state): State<AppState>,
    Path(prompt_type): Path<String>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let prompt_type: PromptType = prompt_type.parse()?;
    let request = body(payload)?;
    let pipeline = GenerationPipeline::new(state.provider.clone());
    Ok(Json(pipeline.run(prompt_type, &request).await?))
}

#[derive(Debug, Deserialize)]
struct PromptRequest {
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Serialize)]
struct PromptResponse {
    completion: String,
}

async fn prompt(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PromptResponse>, ApiError> {
    let request = body(payload)?;
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::EmptyPrompt);
    }
    let completion = state
        .provider
        .complete(CompletionRequest::new(PROMPT_INSTRUCTION, prompt))
        .await?;
    Ok(Json(PromptResponse { completion }))
}

async fn validate_file(payload: Result<Json<Value>, JsonRejection>) -> Result<Response, ApiError> {
    let file = body(payload)?;
    let report = validate(&file);
    let status = if report.valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(report)).into_response())
}
