use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::life::HostMetrics;
use crate::topic::{AgentIdentity, EventKind};

/// Shared state for the HTTP boundary.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub identity: AgentIdentity,
    pub server: ServerConfig,
}

/// GET /About response body.
#[derive(Serialize)]
struct AboutResponse {
    #[serde(rename = "Identifier")]
    identifier: String,
    #[serde(rename = "Host")]
    host: String,
    #[serde(rename = "NorthPort")]
    north_port: u16,
    #[serde(rename = "CPU")]
    cpu: f64,
    #[serde(rename = "Memory")]
    memory: f64,
    #[serde(rename = "Diskspace")]
    diskspace: f64,
    #[serde(rename = "Temperature")]
    temperature: f64,
}

/// POST /Rules request: a subscription-triggered rule firing.
#[derive(Deserialize)]
struct RuleRequest {
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Payload")]
    payload: Value,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the About / Rules router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/About", get(about))
        .route("/Rules", post(rules))
        .with_state(Arc::new(state))
}

/// GET /About - agent identity and host resource metrics.
///
/// The sample walks /proc and the disk list synchronously and waits
/// out sysinfo's minimum CPU interval, so it runs on a blocking thread.
async fn about(State(state): State<Arc<ApiState>>) -> Result<Json<AboutResponse>, ApiError> {
    let metrics = tokio::task::spawn_blocking(HostMetrics::sample_blocking)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(AboutResponse {
        identifier: state.identity.entity_id.clone(),
        host: state.server.host.clone(),
        north_port: state.server.port,
        cpu: metrics.cpu,
        memory: metrics.memory,
        diskspace: metrics.diskspace,
        temperature: metrics.temperature,
    }))
}

/// POST /Rules - externally-triggered command or notification.
///
/// The pipeline invocation is spawned on a detached task so the HTTP
/// response never blocks on broker or store I/O; the caller gets no
/// completion signal beyond the 200.
async fn rules(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RuleRequest>,
) -> Result<StatusCode, ApiError> {
    let kind = match request.action.as_str() {
        "Command" => EventKind::Commands,
        "Notification" => EventKind::Notifications,
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown rule action '{other}'"
            )))
        }
    };

    if !request.payload.is_object() {
        return Err(ApiError::BadRequest("payload must be a JSON object".into()));
    }
    let payload = serde_json::to_vec(&request.payload)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(kind = %kind, "Rule triggered");

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.dispatch_direct(kind, &payload).await;
    });

    Ok(StatusCode::OK)
}

enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                error!(error = %msg, "Rejected rules request");
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request handling failed");
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
