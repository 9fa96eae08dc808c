use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{Comment, CreateCommentRequest, CreateReviewRequest, Review, UpdateReviewRequest},
    permissions::{Operation, Resource, authorize},
    services::reviews as service,
};

// --- Reviews ---

/// list_reviews
///
/// [Public Route] Reviews of one title.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 200, description = "Reviews", body = [Review]),
        (status = 404, description = "No such title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn list_reviews(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> Result<Json<Vec<Review>>, ApiError> {
    authorize(actor.as_ref(), Resource::Review, Operation::List, None)?;
    Ok(Json(service::list_reviews(state.repo.as_ref(), title_id).await?))
}

/// create_review
///
/// [Authenticated Route] One review per user per title; the author is the caller.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Invalid text or score", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "No such title", body = ErrorBody),
        (status = 409, description = "Already reviewed", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = service::create_review(state.repo.as_ref(), title_id, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// get_review
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "No such review under this title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn get_review(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<Json<Review>, ApiError> {
    authorize(actor.as_ref(), Resource::Review, Operation::Retrieve, None)?;
    Ok(Json(
        service::get_review(state.repo.as_ref(), title_id, review_id).await?,
    ))
}

/// update_review
///
/// [Authenticated Route] Author, moderators and admins only.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 400, description = "Invalid text or score", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "No such review under this title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn update_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    let review =
        service::update_review(state.repo.as_ref(), title_id, review_id, &user, payload).await?;
    Ok(Json(review))
}

/// delete_review
///
/// [Authenticated Route] Author, moderators and admins only. Comments go with it.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "No such review under this title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn delete_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    service::delete_review(state.repo.as_ref(), title_id, review_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Comments ---

/// list_comments
///
/// [Public Route] Comments on one review.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "No such review under this title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn list_comments(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    authorize(actor.as_ref(), Resource::Comment, Operation::List, None)?;
    Ok(Json(
        service::list_comments(state.repo.as_ref(), title_id, review_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 400, description = "Blank text", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "No such review under this title", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment =
        service::create_comment(state.repo.as_ref(), title_id, review_id, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Not found along this path", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn get_comment(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<Json<Comment>, ApiError> {
    authorize(actor.as_ref(), Resource::Comment, Operation::Retrieve, None)?;
    Ok(Json(
        service::get_comment(state.repo.as_ref(), title_id, review_id, comment_id).await?,
    ))
}

/// update_comment
///
/// [Authenticated Route] Replaces the text. Author, moderators and admins only.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found along this path", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn update_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let comment = service::update_comment(
        state.repo.as_ref(),
        title_id,
        review_id,
        comment_id,
        &user,
        payload,
    )
    .await?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found along this path", body = ErrorBody)
    ),
    tag = "reviews"
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, ApiError> {
    service::delete_comment(state.repo.as_ref(), title_id, review_id, comment_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
