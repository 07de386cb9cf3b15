use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::ServerState;
use crate::llm::{AssistantInput, LlmError, LlmProvider};
use crate::payload::{BackendResponse, RequestPayload};

pub const ROOT_MESSAGE: &str = "API running";
pub const GEMINI_FAILURE: &str = "Failed to communicate with the Gemini API";

pub fn create_router<P>(state: Arc<ServerState<P>>, cors: CorsLayer) -> Router
where
    P: LlmProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/api", post(generate_text::<P>))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Restricts browsers to `frontend_url` when one is configured, otherwise
/// allows any origin.
pub fn cors_layer(frontend_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    let Some(origin) = frontend_url else {
        return Ok(CorsLayer::permissive());
    };

    let origin = HeaderValue::from_str(origin)
        .map_err(|err| anyhow::anyhow!("Invalid FRONTEND_URL '{origin}': {err}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}

async fn generate_text<P>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<RequestPayload>,
) -> (StatusCode, Json<BackendResponse>)
where
    P: LlmProvider + Send + Sync + 'static,
{
    let Some(provider) = state.provider.as_ref() else {
        error!("rejecting /api request: Gemini provider is not configured");
        return failure(&LlmError::MissingApiKey);
    };

    info!(contents = payload.contents.len(), "forwarding request to Gemini");
    let input = AssistantInput::new(payload.contents, &payload.system_instruction);
    match provider.generate(input).await {
        Ok(output) => (StatusCode::OK, Json(BackendResponse::ok(output.text))),
        Err(err) => {
            error!(error = %err, "Gemini request failed");
            failure(&err)
        }
    }
}

fn failure(err: &LlmError) -> (StatusCode, Json<BackendResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(BackendResponse::failure(GEMINI_FAILURE, err.to_string())),
    )
}
