use validator::Validate;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{
        Comment, CreateCommentRequest, CreateReviewRequest, NewComment, NewReview, Review,
        ReviewChanges, UpdateReviewRequest,
    },
    permissions::{Operation, Resource, authorize},
    repository::Repository,
};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 10;

pub fn ensure_score(score: i32) -> Result<(), ApiError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(ApiError::InvalidScore)
    }
}

/// Loads a review, 404 unless it belongs to `title_id`.
async fn scoped_review(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
) -> Result<Review, ApiError> {
    repo.get_review(title_id, review_id)
        .await?
        .ok_or(ApiError::NotFound("review"))
}

/// Loads a comment through its full path: title, then review, then comment.
async fn scoped_comment(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, ApiError> {
    scoped_review(repo, title_id, review_id).await?;
    repo.get_comment(review_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))
}

// --- Reviews ---

pub async fn list_reviews(repo: &dyn Repository, title_id: i64) -> Result<Vec<Review>, ApiError> {
    repo.get_title(title_id)
        .await?
        .ok_or(ApiError::NotFound("title"))?;
    Ok(repo.list_reviews(title_id).await?)
}

pub async fn get_review(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
) -> Result<Review, ApiError> {
    scoped_review(repo, title_id, review_id).await
}

/// create_review
///
/// Score bounds first, then the title, then the one-review-per-author rule. The
/// up-front duplicate lookup only rejects early; the store's unique constraint decides
/// races and its violation maps to the same `DuplicateReview`.
pub async fn create_review(
    repo: &dyn Repository,
    title_id: i64,
    actor: &AuthUser,
    req: CreateReviewRequest,
) -> Result<Review, ApiError> {
    ensure_score(req.score)?;
    req.validate()?;
    authorize(Some(actor), Resource::Review, Operation::Create, None)?;

    repo.get_title(title_id)
        .await?
        .ok_or(ApiError::NotFound("title"))?;

    if repo
        .find_review_by_author(title_id, actor.id)
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateReview);
    }

    let review = repo
        .create_review(NewReview {
            title_id,
            author_id: actor.id,
            text: req.text,
            score: req.score,
        })
        .await?;
    tracing::info!(title_id, review_id = review.id, author = %actor.username, "review created");
    Ok(review)
}

pub async fn update_review(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    actor: &AuthUser,
    req: UpdateReviewRequest,
) -> Result<Review, ApiError> {
    let review = scoped_review(repo, title_id, review_id).await?;
    authorize(
        Some(actor),
        Resource::Review,
        Operation::Update,
        Some(review.author_id),
    )?;
    if let Some(score) = req.score {
        ensure_score(score)?;
    }
    req.validate()?;

    repo.update_review(
        review.id,
        ReviewChanges {
            text: req.text,
            score: req.score,
        },
    )
    .await?
    .ok_or(ApiError::NotFound("review"))
}

pub async fn delete_review(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    actor: &AuthUser,
) -> Result<(), ApiError> {
    let review = scoped_review(repo, title_id, review_id).await?;
    authorize(
        Some(actor),
        Resource::Review,
        Operation::Delete,
        Some(review.author_id),
    )?;
    if !repo.delete_review(review.id).await? {
        return Err(ApiError::NotFound("review"));
    }
    tracing::info!(title_id, review_id, by = %actor.username, "review deleted");
    Ok(())
}

// --- Comments ---

pub async fn list_comments(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
) -> Result<Vec<Comment>, ApiError> {
    scoped_review(repo, title_id, review_id).await?;
    Ok(repo.list_comments(review_id).await?)
}

pub async fn get_comment(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, ApiError> {
    scoped_comment(repo, title_id, review_id, comment_id).await
}

pub async fn create_comment(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    actor: &AuthUser,
    req: CreateCommentRequest,
) -> Result<Comment, ApiError> {
    req.validate()?;
    authorize(Some(actor), Resource::Comment, Operation::Create, None)?;
    scoped_review(repo, title_id, review_id).await?;

    Ok(repo
        .create_comment(NewComment {
            review_id,
            author_id: actor.id,
            text: req.text,
        })
        .await?)
}

pub async fn update_comment(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
    actor: &AuthUser,
    req: CreateCommentRequest,
) -> Result<Comment, ApiError> {
    let comment = scoped_comment(repo, title_id, review_id, comment_id).await?;
    authorize(
        Some(actor),
        Resource::Comment,
        Operation::Update,
        Some(comment.author_id),
    )?;
    req.validate()?;

    repo.update_comment(comment.id, req.text)
        .await?
        .ok_or(ApiError::NotFound("comment"))
}

pub async fn delete_comment(
    repo: &dyn Repository,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
    actor: &AuthUser,
) -> Result<(), ApiError> {
    let comment = scoped_comment(repo, title_id, review_id, comment_id).await?;
    authorize(
        Some(actor),
        Resource::Comment,
        Operation::Delete,
        Some(comment.author_id),
    )?;
    if !repo.delete_comment(comment.id).await? {
        return Err(ApiError::NotFound("comment"));
    }
    Ok(())
}
