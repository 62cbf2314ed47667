use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::AppState;
use crate::error::{Error, Result};
use crate::middleware::{CurrentSession, SESSION_COOKIE};
use crate::models::{LoginRequest, LoginResponse, UserInfo};
use crate::session::{Session, SessionInfo};
use crate::signals::{LoginEvent, LogoutEvent};

fn session_cookie(session_key: &str, max_age: i64) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session_key, max_age
    )
}

/// Bind a new session to the user and announce the login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .config
        .find_user(&payload.username)
        .cloned()
        .ok_or_else(|| Error::Unauthorized(format!("unknown user '{}'", payload.username)))?;

    let mut session = Session::new(state.enforcer.config());
    session.set_user_id(user.id);
    let session_key = session.session_key.clone();
    state.sessions.save_session(session).await?;

    state
        .signals
        .user_logged_in
        .send(&LoginEvent {
            user: user.clone(),
            session_key: session_key.clone(),
        })
        .await?;

    let active_sessions = state.enforcer.active_session_count(user.id).await?;
    let cookie = session_cookie(&session_key, state.enforcer.config().ttl_secs);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            session_key,
            user: UserInfo::from(user),
            active_sessions,
        }),
    ))
}

/// Announce the logout, then flush the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse> {
    state
        .signals
        .user_logged_out
        .send(&LogoutEvent {
            user: Some(current.user.clone()),
            session_key: Some(current.session_key.clone()),
        })
        .await?;

    // already gone when the logout-all receiver ran
    state.sessions.delete_session(&current.session_key).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    ))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Vec<SessionInfo>>> {
    let sessions = state.enforcer.sessions_for_user(current.user.id).await?;

    Ok(Json(
        sessions
            .iter()
            .map(|s| s.to_info(Some(current.session_key.as_str())))
            .collect(),
    ))
}
