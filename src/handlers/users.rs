use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{CreateUserRequest, SearchFilter, UpdateUserRequest, User, UserChanges, UserProfile},
    permissions::{Operation, Resource, authorize},
};

/// Looks `username` up and checks `operation` against it. A non-admin asking about
/// someone else gets 403 whether or not the account exists.
async fn load_user_for(
    state: &AppState,
    actor: &AuthUser,
    username: &str,
    operation: Operation,
) -> Result<User, ApiError> {
    let target = state.repo.get_user_by_username(username).await?;
    authorize(
        Some(actor),
        Resource::User,
        operation,
        target.as_ref().map(|user| user.id),
    )?;
    target.ok_or(ApiError::NotFound("user"))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Own profile", body = UserProfile),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    authorize(Some(&user), Resource::OwnProfile, Operation::Retrieve, Some(user.id))?;
    let me = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(me.into()))
}

/// update_me
///
/// [Authenticated Route] Partial profile update. `role` is silently ignored here.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid or taken fields", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    authorize(Some(&user), Resource::OwnProfile, Operation::Update, Some(user.id))?;
    payload.validate()?;

    let changes = UserChanges {
        role: None,
        ..UserChanges::from(payload)
    };
    let updated = state
        .repo
        .update_user(user.id, changes)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(updated.into()))
}

/// list_users
///
/// [Admin Route] All accounts, optionally filtered by a username substring.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(SearchFilter),
    responses(
        (status = 200, description = "Accounts", body = [UserProfile]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    authorize(Some(&user), Resource::User, Operation::List, None)?;
    let users = state.repo.list_users(filter.search).await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// create_user
///
/// [Admin Route] Creates an account with any role. No confirmation code is sent.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Invalid or taken fields", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    authorize(Some(&user), Resource::User, Operation::Create, None)?;
    payload.validate()?;

    let created = state.repo.create_user(payload.into()).await?;
    tracing::info!(username = %created.username, by = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// get_user
///
/// [Admin Route] One account by username. Non-admins may read their own.
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Account", body = UserProfile),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let target = load_user_for(&state, &user, &username, Operation::Retrieve).await?;
    Ok(Json(target.into()))
}

/// update_user
///
/// [Admin Route] Partial update of any account, including its role.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid or taken fields", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let target = load_user_for(&state, &user, &username, Operation::Update).await?;
    payload.validate()?;

    let updated = state
        .repo
        .update_user(target.id, payload.into())
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(updated.into()))
}

/// delete_user
///
/// [Admin Route] Removes the account together with its reviews and comments.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target = load_user_for(&state, &user, &username, Operation::Delete).await?;
    if !state.repo.delete_user(target.id).await? {
        return Err(ApiError::NotFound("user"));
    }
    tracing::info!(username = %target.username, by = %user.username, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
