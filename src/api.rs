//! HTTP binding of the game service
//!
//! Routes (the game routes are nested under `server.root_path`):
//!
//! - `GET  /` and `GET /health`
//! - `POST {root}/game/sessions`
//! - `GET  {root}/game/sessions/:session_id`
//! - `POST {root}/game/sessions/:session_id/choices`
//! - `POST {root}/game/sessions/:session_id/complete`
//! - `GET  {root}/game/stats/:dilemma_id`
//!
//! Errors are returned as `{"detail": "..."}` with 404 / 400 / 409 for the
//! client-addressable cases, 503 for a request that timed out before its
//! write committed, and an opaque 500 otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{DilemmaError, Result};
use crate::game::{ChoiceCreate, ChoiceResponse, DilemmaStat, GameService, SessionSummary};
use crate::storage::Session;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    service: GameService,
    app_name: String,
    request_timeout: Duration,
}

/// Error response carrying an HTTP status and a client-facing message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl ApiError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "Internal server error".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let (status, detail) = match err.downcast_ref::<DilemmaError>() {
            Some(DilemmaError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            Some(DilemmaError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            Some(DilemmaError::Conflict(msg)) => (StatusCode::CONFLICT, msg.clone()),
            Some(DilemmaError::Cancelled(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Request timed out".to_string(),
            ),
            _ => {
                tracing::error!("Request failed: {:#}", err);
                return Self::internal();
            }
        };
        Self { status, detail }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                detail: &self.detail,
            }),
        )
            .into_response()
    }
}

/// Build the application router
pub fn router(service: GameService, config: &Config) -> Router {
    let state = AppState {
        service,
        app_name: config.app.name.clone(),
        request_timeout: Duration::from_secs(config.server.request_timeout_seconds),
    };

    let game = Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/choices", post(record_choice))
        .route("/sessions/:session_id/complete", post(complete_session))
        .route("/stats/:dilemma_id", get(dilemma_stats));
    let api = Router::new().nest("/game", game);

    let app = Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check));

    let app = if config.server.root_path.is_empty() {
        app.merge(api)
    } else {
        app.nest(&config.server.root_path, api)
    };

    app.with_state(state)
}

/// Run a blocking service call off the async runtime, bounded by the
/// configured request timeout
///
/// When the timeout fires the call is cancelled and then awaited, so the
/// response always reflects whether its write committed.
async fn run_blocking<T, F>(state: &AppState, f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(GameService) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let service = state.service.with_cancellation(Arc::clone(&cancelled));
    let mut task = tokio::task::spawn_blocking(move || f(service));

    let joined = match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(
                "Request exceeded timeout of {}s, cancelling",
                state.request_timeout.as_secs()
            );
            cancelled.store(true, Ordering::SeqCst);
            task.await
        }
    };

    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(join_err) => {
            tracing::error!("Blocking task failed: {}", join_err);
            Err(ApiError::internal())
        }
    }
}

async fn read_root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": state.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match run_blocking(&state, |service| service.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "database": "connected"})),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy", "database": "unavailable"})),
        ),
    }
}

async fn create_session(
    State(state): State<AppState>,
) -> std::result::Result<Json<Session>, ApiError> {
    let session = run_blocking(&state, |service| service.create_session()).await?;
    Ok(Json(session))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> std::result::Result<Json<Session>, ApiError> {
    let session = run_blocking(&state, move |service| service.get_session(&session_id)).await?;
    Ok(Json(session))
}

async fn record_choice(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<ChoiceCreate>, JsonRejection>,
) -> std::result::Result<Json<ChoiceResponse>, ApiError> {
    let Json(request) = payload?;
    let recorded = run_blocking(&state, move |service| {
        service.record_choice(&session_id, &request)
    })
    .await?;
    Ok(Json(recorded))
}

async fn dilemma_stats(
    State(state): State<AppState>,
    Path(dilemma_id): Path<String>,
) -> std::result::Result<Json<DilemmaStat>, ApiError> {
    let stat = run_blocking(&state, move |service| service.dilemma_stats(&dilemma_id)).await?;
    Ok(Json(stat))
}

async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> std::result::Result<Json<SessionSummary>, ApiError> {
    let summary =
        run_blocking(&state, move |service| service.complete_session(&session_id)).await?;
    Ok(Json(summary))
}
