use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the bearer tokens issued by `POST /auth/token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID. Used to reload the account on every request.
    pub sub: Uuid,
    /// The username the token was issued to.
    pub username: String,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Role and superuser flag are read
/// from the database on every request, so role changes apply immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

/// issue_token
///
/// Signs an HS256 bearer token asserting `user`'s identity, valid for
/// `config.token_ttl_secs`.
pub fn issue_token(config: &AppConfig, user: &User) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let ttl = usize::try_from(config.token_ttl_secs).unwrap_or(usize::MAX);
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: now,
        exp: now.saturating_add(ttl),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// decode_token
///
/// Verifies signature and expiry. Any failure is reported as `Unauthenticated`.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        ApiError::Unauthenticated
    })
}

/// resolve_auth_user
///
/// Shared by both extractor impls. Returns `Ok(None)` when the request carries no
/// credentials at all, and an error when it carries credentials that do not check out.
///
/// 1. Dev bypass: with `dev_auth_bypass` on, an `x-user-id` header naming an existing user is accepted.
/// 2. `Authorization: Bearer <jwt>` is decoded and validated.
/// 3. The account is reloaded so deleted users lose access immediately.
async fn resolve_auth_user<S>(parts: &Parts, state: &S) -> Result<Option<AuthUser>, ApiError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    if config.dev_auth_bypass {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id_str| Uuid::parse_str(id_str).ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(AuthUser::from(user)));
            }
        }
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = decode_token(&config, token)?;

    let user = repo
        .get_user(claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Some(AuthUser::from(user)))
}

/// Required authentication: anonymous requests are rejected with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_auth_user(parts, state)
            .await?
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Optional authentication (`Option<AuthUser>`): anonymous requests pass through as
/// `None`, but a bad token is still a 401.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve_auth_user(parts, state).await
    }
}
