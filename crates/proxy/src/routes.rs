//! Proxy routes and error mapping.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use fincoach_protocol::GoalSubmission;

use crate::upstream::Upstream;

/// Proxy-layer failures. The client always sees a generic body; the
/// real upstream error only goes to the log.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream request failed while trying to {action}")]
    Upstream {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            ProxyError::Upstream { action, source } => {
                error!(
                    component = "proxy",
                    event = "proxy.upstream_failed",
                    action = %action,
                    error = %source,
                    "Upstream call failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": format!("Failed to {action}") })),
                )
                    .into_response()
            }
        }
    }
}

/// Build the proxy router around one upstream client.
pub fn router(upstream: Upstream) -> Router {
    let upstream = Arc::new(upstream);
    Router::new()
        .route(
            "/sessions",
            post(create_session)
                .get(list_sessions)
                .fallback(sessions_method_not_allowed),
        )
        .route(
            "/sessions/{id}",
            delete(delete_session).fallback(session_item_method_not_allowed),
        )
        .route("/goal", post(submit_goal).fallback(goal_method_not_allowed))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(upstream)
}

async fn create_session(
    State(upstream): State<Arc<Upstream>>,
) -> Result<Json<Value>, ProxyError> {
    let body = upstream
        .create_session()
        .await
        .map_err(|source| ProxyError::Upstream {
            action: "create session",
            source,
        })?;
    Ok(Json(body))
}

async fn list_sessions(
    State(upstream): State<Arc<Upstream>>,
) -> Result<Json<Value>, ProxyError> {
    let body = upstream
        .list_sessions()
        .await
        .map_err(|source| ProxyError::Upstream {
            action: "fetch sessions",
            source,
        })?;
    Ok(Json(body))
}

async fn delete_session(
    State(upstream): State<Arc<Upstream>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    let body = upstream
        .delete_session(&id)
        .await
        .map_err(|source| ProxyError::Upstream {
            action: "delete session",
            source,
        })?;
    Ok(Json(body))
}

async fn submit_goal(
    State(upstream): State<Arc<Upstream>>,
    Json(goal): Json<GoalSubmission>,
) -> Result<Json<Value>, ProxyError> {
    let _ = upstream
        .submit_goal(&goal)
        .await
        .map_err(|source| ProxyError::Upstream {
            action: "submit goal",
            source,
        })?;
    Ok(Json(json!({ "reply": "Got it! I'm generating your plan..." })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn sessions_method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, GET, DELETE")],
    )
}

async fn session_item_method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "DELETE")])
}

async fn goal_method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")])
}
