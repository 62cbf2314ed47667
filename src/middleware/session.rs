use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::error::Error;
use crate::handlers::AppState;
use crate::models::User;

pub const SESSION_COOKIE: &str = "sessionid";

// Extension holding the resolved session and its user
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session_key: String,
    pub user: User,
}

/// Extract the session key from the `Cookie` header
pub fn session_key_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub async fn session_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let session_key = session_key_from_headers(&headers)
        .ok_or_else(|| Error::Unauthorized("missing session cookie".to_string()))?;

    let session = state
        .sessions
        .get_session(&session_key)
        .await?
        .filter(|s| !s.is_expired())
        .ok_or_else(|| Error::SessionNotFound(session_key.clone()))?;

    let user = session
        .user_id()
        .and_then(|id| state.config.users.iter().find(|u| u.id == id))
        .cloned()
        .ok_or_else(|| Error::Unauthorized("session has no known user".to_string()))?;

    request.extensions_mut().insert(CurrentSession { session_key, user });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::router;
    use crate::models::AppConfig;
    use crate::policy::PredicateRegistry;
    use crate::session::{
        MemorySessionStorage, Session, SessionConfig, SessionEnforcer, SessionStorage,
    };
    use crate::settings::SettingsHandle;
    use crate::signals::AuthSignals;
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn setup() -> (AppState, Arc<MemorySessionStorage>, User) {
        let user = User::new("alice", "alice@example.com");
        let config = AppConfig {
            users: vec![user.clone()],
            ..Default::default()
        };

        let storage = Arc::new(MemorySessionStorage::new());
        let enforcer = Arc::new(SessionEnforcer::new(
            storage.clone(),
            storage.clone(),
            SettingsHandle::new(config.session.clone()),
            PredicateRegistry::new(),
            config.session_config(),
        ));

        let state = AppState {
            enforcer,
            signals: Arc::new(AuthSignals::new()),
            sessions: storage.clone(),
            config: Arc::new(config),
        };
        (state, storage, user)
    }

    async fn save_session(
        storage: &MemorySessionStorage,
        key: &str,
        ttl_secs: i64,
        user_id: Uuid,
    ) {
        let mut session = Session::with_key(key, &SessionConfig { ttl_secs });
        session.set_user_id(user_id);
        storage.save_session(session).await.unwrap();
    }

    async fn list_sessions_status(state: AppState, cookie: Option<&str>) -> StatusCode {
        let mut request = axum::http::Request::builder().uri("/api/v1/sessions");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        router(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_valid_session_passes() {
        let (state, storage, user) = setup();
        save_session(&storage, "live", 3600, user.id).await;

        let status = list_sessions_status(state, Some("sessionid=live")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let (state, _, _) = setup();
        let status = list_sessions_status(state, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_and_expired_sessions_are_rejected() {
        let (state, storage, user) = setup();
        save_session(&storage, "stale", -1, user.id).await;

        let status = list_sessions_status(state.clone(), Some("sessionid=stale")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let status = list_sessions_status(state, Some("sessionid=nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_for_unknown_user_is_unauthorized() {
        let (state, storage, _) = setup();
        save_session(&storage, "orphan", 3600, Uuid::new_v4()).await;

        let status = list_sessions_status(state, Some("sessionid=orphan")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_session_key_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc123; lang=en"),
        );

        assert_eq!(session_key_from_headers(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_key_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_key_from_headers(&headers), None);
    }
}
