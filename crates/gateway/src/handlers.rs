//! Request handlers for the three pipeline stages.

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::FormRejection,
        State,
    },
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use ripple_core::{
    codec,
    types::{ActionOutcome, ActionRequest, DetectedObject, Intent, Session, DEFAULT_SESSION_ID},
    Error, Result,
};
use ripple_governance::record_sessions;

use crate::error::ApiError;
use crate::server::AppState;

/// Labels passed to inference as scene context.
const NEARBY_CONTEXT: usize = 5;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Analysis response.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: String,
    pub objects: Vec<DetectedObject>,
    pub image_width: u32,
    pub image_height: u32,
}

/// Inference form.
#[derive(Debug, Deserialize)]
pub struct InferForm {
    #[serde(default)]
    pub clicked_label: String,
    #[serde(default)]
    pub click_x: Option<f64>,
    #[serde(default)]
    pub click_y: Option<f64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Inference response.
#[derive(Debug, Serialize)]
pub struct InferResponse {
    pub intents: Vec<Intent>,
}

/// Execution form. Structured fields arrive as JSON text.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteForm {
    #[serde(default)]
    pub intent_id: Option<String>,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "box")]
    pub box_json: Option<String>,
    #[serde(default)]
    pub action_data: Option<String>,
    #[serde(default, alias = "enable_image_edit")]
    pub enable_edit: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Execution response.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub status: String,
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Upload an image, detect its objects and (re)start the session.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<AnalyzeResponse>, ApiError> {
    let trace_id = Uuid::new_v4().to_string();
    let multipart = multipart
        .map_err(|e| ApiError::new(Error::invalid_request(e.body_text()), &trace_id))?;
    analyze(&state, multipart, &trace_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &trace_id))
}

/// Suggest intents for a clicked object.
pub async fn infer_handler(
    State(state): State<Arc<AppState>>,
    form: std::result::Result<Form<InferForm>, FormRejection>,
) -> std::result::Result<Json<InferResponse>, ApiError> {
    let trace_id = Uuid::new_v4().to_string();
    let Form(form) =
        form.map_err(|e| ApiError::new(Error::invalid_request(e.body_text()), &trace_id))?;
    infer(&state, form, &trace_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &trace_id))
}

/// Execute a chosen intent.
pub async fn execute_handler(
    State(state): State<Arc<AppState>>,
    form: std::result::Result<Form<ExecuteForm>, FormRejection>,
) -> std::result::Result<Json<ExecuteResponse>, ApiError> {
    let trace_id = Uuid::new_v4().to_string();
    let Form(form) =
        form.map_err(|e| ApiError::new(Error::invalid_request(e.body_text()), &trace_id))?;
    execute(&state, form, &trace_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &trace_id))
}

async fn analyze(state: &AppState, mut multipart: Multipart, trace_id: &str) -> Result<AnalyzeResponse> {
    let mut file = None;
    let mut session_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::invalid_request(format!("Failed to read upload: {}", e)))?;
                file = Some(bytes);
            }
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::invalid_request(format!("Failed to read session_id: {}", e)))?;
                session_id = Some(text);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| Error::invalid_request("Missing multipart field 'file'"))?;
    let image = codec::load(&file)
        .map_err(|e| Error::invalid_request(format!("Uploaded file is not a readable image: {}", e)))?;
    let session_id = resolve_session_id(session_id);
    let (image_width, image_height) = image.dimensions();

    tracing::info!(
        trace_id = %trace_id,
        session_id = %session_id,
        bytes = file.len(),
        width = image_width,
        height = image_height,
        "Analyzing uploaded image"
    );

    let objects = state.pipeline.scene.analyze(&image).await;
    state
        .store
        .put(Session::new(session_id.clone(), image, objects.clone()))
        .await?;
    record_sessions(state.store.count().await?);

    Ok(AnalyzeResponse {
        session_id,
        objects,
        image_width,
        image_height,
    })
}

async fn infer(state: &AppState, form: InferForm, trace_id: &str) -> Result<InferResponse> {
    let clicked_label = form.clicked_label.trim();
    if clicked_label.is_empty() {
        return Err(Error::invalid_request("clicked_label is required"));
    }
    let (click_x, click_y) = click_point(form.click_x, form.click_y)?;
    let session_id = resolve_session_id(form.session_id);
    let handle = state.store.get(&session_id).await?.ok_or_else(|| {
        Error::missing_precondition("No image uploaded. Please upload an image first.")
    })?;

    let (image, nearby) = {
        let session = handle.lock().await;
        (session.image.clone(), session.nearby_labels(NEARBY_CONTEXT))
    };

    tracing::info!(
        trace_id = %trace_id,
        session_id = %session_id,
        label = %clicked_label,
        click_x,
        click_y,
        "Inferring intents"
    );

    let intents = state
        .pipeline
        .intents
        .infer(&image, clicked_label, &nearby)
        .await;
    Ok(InferResponse { intents })
}

async fn execute(state: &AppState, form: ExecuteForm, trace_id: &str) -> Result<ExecuteResponse> {
    let action_type = form
        .action_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("edit");
    let request = ActionRequest::from_fields(
        action_type,
        form.prompt.as_deref(),
        form.box_json.as_deref(),
        form.action_data.as_deref(),
        parse_flag(form.enable_edit.as_deref()),
    )?;

    let session_id = resolve_session_id(form.session_id);
    tracing::info!(
        trace_id = %trace_id,
        session_id = %session_id,
        intent_id = ?form.intent_id,
        action_type = %request.kind(),
        "Executing action"
    );

    let handle = state.store.get(&session_id).await?;
    let outcome = state.pipeline.executor.execute(handle.as_ref(), request).await?;
    let action_type = outcome.kind().to_string();

    let (image_base64, data) = match outcome {
        ActionOutcome::Edited { image, applied } => {
            tracing::debug!(trace_id = %trace_id, applied, "Edit finished");
            (Some(codec::encode_rgb(&image)?), None)
        }
        ActionOutcome::Info(info) => (None, Some(serde_json::to_value(info)?)),
        ActionOutcome::Navigate(nav) => (None, Some(serde_json::to_value(nav)?)),
        ActionOutcome::Search { query, results } => (
            None,
            Some(serde_json::json!({ "search_query": query, "results": results })),
        ),
    };

    Ok(ExecuteResponse {
        status: "success".to_string(),
        action_type,
        image_base64,
        data,
    })
}

/// Session named by the request, or the default one.
pub fn resolve_session_id(requested: Option<String>) -> String {
    requested
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

/// Click coordinates; both are required and must be finite.
pub fn click_point(x: Option<f64>, y: Option<f64>) -> Result<(f64, f64)> {
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok((x, y)),
        (Some(_), Some(_)) => Err(Error::invalid_request("click_x and click_y must be numbers")),
        _ => Err(Error::invalid_request("click_x and click_y are required")),
    }
}

/// Form boolean; absent means enabled.
pub fn parse_flag(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
    }
}
