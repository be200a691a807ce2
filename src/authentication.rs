use crate::errors::RequestError;
use crate::AppState;
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const SESSION_EXPIRY_DURATION: time::Duration = time::Duration::days(14);
pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaim {
    id: i64,
    username: String,
    exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// The caller of the current request; `None` for anonymous visitors.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<AppState>()
            .ok_or(RequestError::ServerError)?;
        let token = match session_token(parts) {
            Some(token) => token,
            None => return Ok(MaybeUser(None)),
        };
        // A stale or tampered cookie only downgrades the caller to anonymous.
        match verify_session_token(&state.config.jwt_secret, token) {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid session cookie");
                Ok(MaybeUser(None))
            }
        }
    }
}

fn session_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

pub fn get_session_token(secret: &str, id: i64, username: &str) -> Result<String> {
    let expiry_date = OffsetDateTime::now_utc() + SESSION_EXPIRY_DURATION;
    let claim = SessionClaim {
        id,
        username: username.to_owned(),
        exp: expiry_date.unix_timestamp(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
    )
    .context("Failed to generate session token")
}

pub fn verify_session_token(secret: &str, token: &str) -> Result<AuthUser, RequestError> {
    let token_data = jsonwebtoken::decode::<SessionClaim>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .map_err(|_| RequestError::NotAuthorized("Invalid session"))?;
    let claim = token_data.claims;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Session expired"));
    }
    Ok(AuthUser {
        id: claim.id,
        username: claim.username,
    })
}

/// `Set-Cookie` value that establishes a session.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        SESSION_EXPIRY_DURATION.whole_seconds()
    )
}

/// `Set-Cookie` value that tears the session down.
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to parse password hash"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
