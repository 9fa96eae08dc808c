use crate::models::{
    Comment, CreateTermRequest, NewComment, NewReview, NewTitle, NewUser, Review, ReviewChanges,
    Term, TermKind, TitleChanges, TitleFilter, TitleView, User, UserChanges,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Names of the unique constraints the stores enforce. Both implementations report
/// violations under these names so that `ApiError` can map them to field errors.
pub mod constraints {
    pub const USERNAME: &str = "users_username_key";
    pub const EMAIL: &str = "users_email_key";
    pub const CATEGORY_SLUG: &str = "categories_slug_key";
    pub const GENRE_SLUG: &str = "genres_slug_key";
    pub const REVIEW_TITLE_AUTHOR: &str = "reviews_title_author_key";
}

/// RepoError
///
/// Persistence failures. Unique violations are pulled out by constraint name because
/// the API reports them as conflicts rather than server errors.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return RepoError::UniqueViolation(constraint);
            }
        }
        RepoError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers and services only see
/// this trait, so the Postgres store and the in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User Directory ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    // Ordered by username; `search` is a case-insensitive substring match.
    async fn list_users(&self, search: Option<String>) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>>;
    // Cascades to the user's reviews and comments.
    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;
    // Replaces whatever code the user had before.
    async fn set_confirmation_code(&self, id: Uuid, code: &str) -> RepoResult<bool>;
    async fn get_confirmation_code(&self, id: Uuid) -> RepoResult<Option<String>>;

    // --- Categories & Genres ---
    async fn list_terms(&self, kind: TermKind, search: Option<String>) -> RepoResult<Vec<Term>>;
    async fn get_term(&self, kind: TermKind, slug: &str) -> RepoResult<Option<Term>>;
    async fn create_term(&self, kind: TermKind, req: CreateTermRequest) -> RepoResult<Term>;
    // Deleting a category nulls the category of its titles; deleting a genre unlinks it.
    async fn delete_term(&self, kind: TermKind, slug: &str) -> RepoResult<bool>;

    // --- Titles ---
    // Every returned view carries the rating computed from the current reviews.
    async fn list_titles(&self, filter: TitleFilter) -> RepoResult<Vec<TitleView>>;
    async fn get_title(&self, id: i64) -> RepoResult<Option<TitleView>>;
    async fn create_title(&self, title: NewTitle) -> RepoResult<TitleView>;
    async fn update_title(&self, id: i64, changes: TitleChanges) -> RepoResult<Option<TitleView>>;
    // Cascades to reviews and their comments.
    async fn delete_title(&self, id: i64) -> RepoResult<bool>;

    // --- Reviews ---
    async fn list_reviews(&self, title_id: i64) -> RepoResult<Vec<Review>>;
    // Scoped to the parent title: a review of another title is reported as absent.
    async fn get_review(&self, title_id: i64, id: i64) -> RepoResult<Option<Review>>;
    async fn find_review_by_author(&self, title_id: i64, author_id: Uuid) -> RepoResult<Option<Review>>;
    // Fails with `UniqueViolation(REVIEW_TITLE_AUTHOR)` if the pair already has a review.
    async fn create_review(&self, review: NewReview) -> RepoResult<Review>;
    async fn update_review(&self, id: i64, changes: ReviewChanges) -> RepoResult<Option<Review>>;
    async fn delete_review(&self, id: i64) -> RepoResult<bool>;

    // --- Comments ---
    async fn list_comments(&self, review_id: i64) -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, review_id: i64, id: i64) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment>;
    async fn update_comment(&self, id: i64, text: String) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
