// HTTP surface of the demo host: login, logout and session listing

pub mod auth;
pub mod health;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;

use crate::error::Error;
use crate::middleware::session_middleware;
use crate::models::AppConfig;
use crate::session::{SessionEnforcer, SessionStorage};
use crate::signals::AuthSignals;

#[derive(Clone)]
pub struct AppState {
    pub enforcer: Arc<SessionEnforcer>,
    pub signals: Arc<AuthSignals>,
    pub sessions: Arc<dyn SessionStorage>,
    pub config: Arc<AppConfig>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::SessionNotFound(_) | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::ImproperlyConfigured(_) | Error::Config(_) | Error::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/sessions", get(auth::list_sessions))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/", get(health::health_check))
        .route("/health", get(health::health_check))
        .route("/api/v1/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
