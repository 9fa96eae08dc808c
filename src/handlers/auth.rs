use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{ApiError, ErrorBody},
    models::{SignUpRequest, TokenRequest, TokenResponse},
    services::signup,
};

/// signup
///
/// [Public Route] Registers a user and emails a confirmation code. Repeating the call
/// with the same username and email re-sends a fresh code to the existing account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Code sent", body = SignUpRequest),
        (status = 400, description = "Invalid or taken username/email", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<SignUpRequest>, ApiError> {
    let echoed = signup::sign_up(state.repo.as_ref(), state.notifier.as_ref(), payload).await?;
    Ok(Json(echoed))
}

/// obtain_token
///
/// [Public Route] Exchanges `username` + `confirmation_code` for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Wrong confirmation code", body = ErrorBody),
        (status = 404, description = "Unknown username", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = signup::obtain_token(state.repo.as_ref(), &state.config, payload).await?;
    Ok(Json(token))
}
