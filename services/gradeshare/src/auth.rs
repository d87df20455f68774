use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use grades::StudentId;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ApiError, AuthFailure};
use crate::state::SharedState;

pub const TOKEN_COOKIE: &str = "cookie_token";

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, student: &StudentId) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take any key length");
    mac.update(student.as_str().as_bytes());
    mac
}

/// `<student id>.<hex hmac-sha256>`
pub fn sign_token(secret: &str, student: &StudentId) -> String {
    let tag = mac_for(secret, student).finalize().into_bytes();
    format!("{}.{}", student, hex::encode(tag))
}

pub fn verify_token(secret: &str, token: &str) -> Result<StudentId, AuthFailure> {
    let (id, tag_hex) = token.split_once('.').ok_or(AuthFailure::Invalid)?;
    let student = StudentId::parse(id).map_err(|_| AuthFailure::Invalid)?;
    let tag = hex::decode(tag_hex).map_err(|_| AuthFailure::Invalid)?;
    mac_for(secret, &student)
        .verify_slice(&tag)
        .map_err(|_| AuthFailure::Invalid)?;
    Ok(student)
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Student authenticated through the token cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser(pub StudentId);

#[async_trait]
impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or(ApiError::Unauthorized(AuthFailure::Missing))?;
        let student = verify_token(&state.config.secret, &token).map_err(ApiError::Unauthorized)?;
        Ok(AuthUser(student))
    }
}
