use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_slug, validate_username};

// --- Roles ---

/// Role
///
/// The RBAC field stored on every account. Capability checks (`is_admin`, `is_moderator`)
/// are derived from it on `User` and `AuthUser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when the `role` column holds something other than the three known roles.
#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record from the `users` table. Never serialized directly:
/// responses go through `UserProfile`, which leaves out the id and the superuser flag.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Superusers are treated as admins whatever their stored role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

/// UserProfile
///
/// Output schema for `/users/me` and the admin user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// TermKind
///
/// Categories and genres share one shape (name + unique slug) and one set of
/// operations; this selects which table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Category,
    Genre,
}

impl TermKind {
    pub fn table(&self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Genre => "genres",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Genre => "genre",
        }
    }
}

/// Term
///
/// A category or genre. Only `name` and `slug` are exposed; the numeric id stays internal.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Term {
    #[serde(skip)]
    #[ts(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// TitleView
///
/// Read shape of a title. `rating` is the mean review score computed at query time
/// and is `null` when the title has no reviews.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct TitleView {
    pub id: i64,
    pub name: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<Term>,
    pub category: Option<Term>,
}

/// Review
///
/// One user's scored opinion of a title. `author` is the author's username, joined in
/// at read time; `author_id` and `title_id` are kept for ownership checks only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Review {
    pub id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub title_id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub author_id: Uuid,
    pub author: String,
    pub text: String,
    pub score: i32,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
}

/// Comment
///
/// A reply attached to a review.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub review_id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub author_id: Uuid,
    pub author: String,
    pub text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input payload for `POST /auth/signup`. Echoed back on success.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct SignUpRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    #[schema(example = "reader42")]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    #[schema(example = "reader42@example.com")]
    pub email: String,
}

/// TokenRequest
///
/// Input payload for `POST /auth/token`: exchanges an emailed confirmation code for a JWT.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct TokenRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub confirmation_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

/// CreateUserRequest
///
/// Admin-only payload for `POST /users`. Unlike signup, the role can be chosen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: String,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update payload shared by `PATCH /users/me` and `PATCH /users/{username}`.
/// The `/me` handler drops `role` before it reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// CreateTermRequest
///
/// Input payload for `POST /categories` and `POST /genres`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateTermRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters."))]
    #[schema(example = "Science fiction")]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be 1-50 characters."),
        custom(function = "validate_slug")
    )]
    #[schema(example = "sci-fi")]
    pub slug: String,
}

/// CreateTitleRequest
///
/// Write payload for `POST /titles`. Category and genres are referenced by slug.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters."))]
    pub name: String,
    #[validate(range(min = 1, message = "Year cannot be negative."))]
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    /// Genre slugs.
    #[serde(default)]
    pub genre: Vec<String>,
    /// Category slug.
    #[serde(default)]
    pub category: Option<String>,
}

/// UpdateTitleRequest
///
/// Partial update payload for `PATCH /titles/{id}`. A provided `genre` list replaces
/// the existing one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateTitleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters."))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Year cannot be negative."))]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// CreateReviewRequest
///
/// Score bounds are checked by the review service (it reports `INVALID_SCORE`), not here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
    #[schema(minimum = 1, maximum = 10)]
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment. Also used for `PATCH`, where the text is replaced.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
}

// --- Query Filters ---

/// TitleFilter
///
/// Query parameters accepted by `GET /titles`.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleFilter {
    /// Case-insensitive exact match on the title name.
    pub name: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slug.
    pub genre: Option<String>,
    pub year: Option<i32>,
}

/// SearchFilter
///
/// `?search=` substring filter used by the category, genre and user listings.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchFilter {
    pub search: Option<String>,
}

// --- Repository Inputs (resolved, internal) ---

/// NewUser
///
/// A fully-resolved account ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            bio: req.bio.unwrap_or_default(),
            role: req.role.unwrap_or_default(),
            is_superuser: false,
        }
    }
}

/// UserChanges
///
/// Column-level partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
    pub is_superuser: Option<bool>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
            role: req.role,
            is_superuser: None,
        }
    }
}

/// NewTitle
///
/// Title insert with slugs already resolved to ids.
#[derive(Debug, Clone, Default)]
pub struct NewTitle {
    pub name: String,
    pub year: Option<i32>,
    pub description: String,
    pub category_id: Option<i64>,
    pub genre_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub genre_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub title_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub text: Option<String>,
    pub score: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub review_id: i64,
    pub author_id: Uuid,
    pub text: String,
}
