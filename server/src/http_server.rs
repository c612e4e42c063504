use crate::config::AppConfig;
use crate::coordinator;
use crate::session::{Session, SessionStoreRef};
use crate::synthesizer::AnswerSynthesizer;
use crate::turn::{AnswerType, ChatTurn};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use ddugi_core::{LocalSearchError, SearchCategory, VenueLookup};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_MESSAGE_CHARS: usize = 5000;
const MAX_QUERY_CHARS: usize = 500;
const MAX_DISPLAY: u32 = 100;
const APOLOGY_MESSAGE: &str = "죄송합니다. 일시적인 문제가 발생했어요. 다시 시도해 주세요.";

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    /// Absent when no LLM key is configured; chat then answers 503
    synthesizer: Option<Arc<AnswerSynthesizer>>,
    search: Arc<dyn VenueLookup>,
    sessions: SessionStoreRef,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        synthesizer: Option<Arc<AnswerSynthesizer>>,
        search: Arc<dyn VenueLookup>,
        sessions: SessionStoreRef,
    ) -> Self {
        Self {
            config: Arc::new(config),
            synthesizer,
            search,
            sessions,
        }
    }
}

/// Validated body of `POST /api/chat`
#[derive(Debug, PartialEq)]
struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    success: bool,
    data: ChatTurn,
    session_id: String,
    debug: ChatDebug,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatDebug {
    has_search_results: bool,
    locations_found: usize,
    response_type: AnswerType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<Utc>,
    ai: AiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AiStatus {
    llm: &'static str,
    local_search: &'static str,
}

#[derive(Deserialize, Debug)]
struct SearchParams {
    query: Option<String>,
    location: Option<String>,
    display: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct SessionParams {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    /// Request failed validation; never reaches the pipeline
    Validation { field: &'static str, message: String },
    /// Malformed request with a user-facing message
    BadRequest(String),
    Forbidden(String),
    NotConfigured(String),
    /// `detail` is only populated in development
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation { field, message } => {
                warn!(field, message = %message, "Request validation failed");
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "success": false,
                        "error": {
                            "code": "VALIDATION_ERROR",
                            "message": "Invalid request parameters",
                            "details": [{"field": field, "message": message}]
                        }
                    }),
                )
            }
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "message": message}),
            ),
            Self::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({"success": false, "message": message}),
            ),
            Self::NotConfigured(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"success": false, "message": message}),
            ),
            Self::Internal { message, detail } => {
                let mut body = json!({"success": false, "message": message});
                if let Some(detail) = detail {
                    body["error"] = Value::String(detail);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with all routes nested under `/api`
pub fn build_router(state: AppState) -> Router {
    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/chat", post(handle_chat))
        .route("/chat/health", get(chat_health))
        .route("/chat/history", get(chat_history).delete(clear_history))
        .route("/chat/stats", get(chat_stats))
        .route("/chat/sessions", get(list_sessions))
        .route("/search/restaurants", get(search_restaurants))
        .route("/search/accommodations", get(search_accommodations))
        .route("/search/local", get(search_local));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let app = build_router(state);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Liveness probe
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn parse_chat_request(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ChatRequest, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::validation("body", e.body_text()))?;

    let message = match body.get("message") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation("message", "Message is required"))
        }
        Some(Value::String(message)) => message.trim().to_string(),
        Some(_) => return Err(ApiError::validation("message", "Message must be a string")),
    };
    let length = message.chars().count();
    if length == 0 || length > MAX_MESSAGE_CHARS {
        return Err(ApiError::validation(
            "message",
            format!("Message must be between 1 and {} characters", MAX_MESSAGE_CHARS),
        ));
    }

    let session_id = match body.get("sessionId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::String(_)) => {
            return Err(ApiError::validation("sessionId", "Session ID must not be empty"))
        }
        Some(_) => return Err(ApiError::validation("sessionId", "Session ID must be a string")),
    };

    Ok(ChatRequest {
        message,
        session_id,
    })
}

/// Handler for chat messages
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = parse_chat_request(payload)?;
    let synthesizer = state.synthesizer.as_ref().ok_or_else(|| {
        ApiError::NotConfigured("AI 서비스가 설정되지 않았습니다.".to_string())
    })?;

    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let preview: String = request.message.chars().take(50).collect();
    info!(session_id = %session_id, message = %preview, "Processing chat message");

    let turn = coordinator::process_chat(
        synthesizer,
        state.sessions.as_ref(),
        state.config.session.max_turns,
        &session_id,
        &request.message,
    )
    .await
    .map_err(|e| {
        error!(
            session_id = %session_id,
            error = %format!("{:#}", e),
            "Failed to process chat message"
        );
        ApiError::Internal {
            message: APOLOGY_MESSAGE.to_string(),
            detail: state.config.is_development().then(|| format!("{:#}", e)),
        }
    })?;

    let debug = match &turn.metadata {
        Some(metadata) => ChatDebug {
            has_search_results: !metadata.search_results.is_empty(),
            locations_found: metadata.locations.len(),
            response_type: metadata.answer_type,
        },
        None => ChatDebug {
            has_search_results: false,
            locations_found: 0,
            response_type: AnswerType::General,
        },
    };

    Ok(Json(ChatResponse {
        success: true,
        data: turn,
        session_id,
        debug,
    }))
}

/// Readiness of the AI services, decided from configuration alone
async fn chat_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let llm_ready = state.synthesizer.is_some();
    let search_ready = state.search.is_configured();

    let (status_code, status, note) = match (llm_ready, search_ready) {
        (false, _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            Some("LLM API key is not configured"),
        ),
        (true, false) => (
            StatusCode::OK,
            "healthy",
            Some("Running in LLM-only mode; local search is not configured"),
        ),
        (true, true) => (StatusCode::OK, "healthy", None),
    };
    let configured = |ready: bool| if ready { "configured" } else { "not_configured" };

    (
        status_code,
        Json(HealthResponse {
            status,
            timestamp: Utc::now(),
            ai: AiStatus {
                llm: configured(llm_ready),
                local_search: configured(search_ready),
            },
            note,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn required_session_id(
    params: Result<Query<SessionParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation("sessionId", e.body_text()))?;
    params
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("sessionId", "Session ID is required"))
}

fn store_error(state: &AppState, e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "Session store operation failed");
    ApiError::Internal {
        message: APOLOGY_MESSAGE.to_string(),
        detail: state.config.is_development().then(|| e.to_string()),
    }
}

async fn chat_history(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let session_id = required_session_id(params)?;
    let turns = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|e| store_error(&state, e))?;

    Ok(Json(json!({
        "success": true,
        "metadata": {
            "sessionId": session_id,
            "messageCount": turns.len(),
            "conversationStart": turns.first().map(|t| t.timestamp),
        },
        "data": turns,
    })))
}

async fn clear_history(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let session_id = required_session_id(params)?;
    let existed = state
        .sessions
        .clear(&session_id)
        .await
        .map_err(|e| store_error(&state, e))?;
    info!(session_id = %session_id, existed, "Chat history cleared");

    Ok(Json(json!({
        "success": true,
        "message": "Chat history cleared successfully",
        "metadata": {"sessionId": session_id, "clearedAt": Utc::now()},
    })))
}

async fn chat_stats(
    State(state): State<AppState>,
    params: Result<Query<SessionParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let session_id = required_session_id(params)?;
    let turns = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|e| store_error(&state, e))?;

    let mut session = Session::new(session_id);
    session.turns = turns;
    Ok(Json(json!({"success": true, "data": session.stats()})))
}

async fn list_sessions(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if !state.config.is_development() {
        return Err(ApiError::Forbidden(
            "Session listing is only available in development".to_string(),
        ));
    }

    let sessions = state
        .sessions
        .list_sessions()
        .await
        .map_err(|e| store_error(&state, e))?;
    Ok(Json(json!({"success": true, "data": sessions})))
}

async fn search_restaurants(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    category_search(&state, SearchCategory::Restaurant, params).await
}

async fn search_accommodations(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    category_search(&state, SearchCategory::Accommodation, params).await
}

async fn search_local(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    category_search(&state, SearchCategory::Local, params).await
}

async fn category_search(
    state: &AppState,
    category: SearchCategory,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation("query", e.body_text()))?;

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("검색어가 필요합니다.".to_string()))?;
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::validation(
            "query",
            format!("Query must be at most {} characters", MAX_QUERY_CHARS),
        ));
    }
    if let Some(display) = params.display {
        if display == 0 || display > MAX_DISPLAY {
            return Err(ApiError::validation(
                "display",
                format!("Display must be between 1 and {}", MAX_DISPLAY),
            ));
        }
    }
    if !state.search.is_configured() {
        return Err(ApiError::NotConfigured(
            "지역 검색 API가 설정되지 않았습니다.".to_string(),
        ));
    }

    info!(category = ?category, query, "Category search requested");
    let results = state
        .search
        .search_category(category, query, params.location.as_deref(), params.display)
        .await
        .map_err(|e| match e {
            LocalSearchError::NotConfigured => {
                ApiError::NotConfigured("지역 검색 API가 설정되지 않았습니다.".to_string())
            }
            other => ApiError::Internal {
                message: category.failure_message().to_string(),
                detail: state.config.is_development().then(|| other.to_string()),
            },
        })?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "total": results.items.len(),
            "items": results.items,
            "query": results.query,
        },
    })))
}
