use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::Json;
use grades::StudentId;
use tracing::info;

use crate::auth::{sign_token, TOKEN_COOKIE};
use crate::error::ApiError;
use crate::state::SharedState;
use crate::store::User;

pub async fn root() -> Json<&'static str> {
    Json("HELLO ROOT")
}

/// Current semester, e.g. `"111-2"`.
pub async fn get_semester(State(state): State<SharedState>) -> Json<String> {
    Json(state.config.semester.to_string())
}

/// Time-to-live in seconds for client-side caches.
pub async fn get_ttl(State(state): State<SharedState>) -> Json<u64> {
    Json(state.config.ttl_secs)
}

/// Pinged by the extension every time its dialog opens.
pub async fn analytics_dialog() {}

fn require_test_routes(state: &SharedState) -> Result<(), ApiError> {
    if state.config.mode.allows_test_routes() {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn db_check(State(state): State<SharedState>) -> Result<Json<&'static str>, ApiError> {
    require_test_routes(&state)?;
    state.store.ping().await?;
    Ok(Json("HELLO WORLD"))
}

/// Registers a student and hands out a token cookie. Test mode only.
pub async fn add_auth(
    State(state): State<SharedState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_test_routes(&state)?;
    let student = StudentId::parse(&student_id)?;

    if state.store.get_user(&student).await?.is_none() {
        state.store.put_user(&User::new(student.clone())).await?;
        info!(student = %student, "add-auth: user created");
    }

    let token = sign_token(&state.config.secret, &student);
    let mut cookie = format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if state.config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    Ok(([(SET_COOKIE, cookie)], Json(token)))
}
