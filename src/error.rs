use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::repository::{RepoError, constraints};

/// Field name → list of human-readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// ErrorBody
///
/// Structured error response returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `VALIDATION_ERROR`, `DUPLICATE_REVIEW`,
    /// `USERNAME_TAKEN`, `PERMISSION_DENIED`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    #[schema(example = "Request validation failed")]
    pub message: String,
    /// Per-field messages, present for validation and conflict errors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: FieldErrors,
}

/// ApiError
///
/// Every failure a request can end in. Recovered at the handler boundary and rendered
/// as an `ErrorBody`; none of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(FieldErrors),
    #[error("score must be between 1 and 10")]
    InvalidScore,
    #[error("invalid username or confirmation code")]
    InvalidCredentials,
    #[error("a review of this title by this author already exists")]
    DuplicateReview,
    /// Uniqueness conflict on a user-facing field (username, email, slug).
    #[error("conflict ({code})")]
    Conflict {
        code: &'static str,
        fields: FieldErrors,
    },
    #[error("authentication required")]
    Unauthenticated,
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Single-field validation error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(fields)
    }

    pub fn username_taken() -> Self {
        ApiError::Conflict {
            code: "USERNAME_TAKEN",
            fields: single("username", "A user with that username already exists."),
        }
    }

    pub fn email_taken() -> Self {
        ApiError::Conflict {
            code: "EMAIL_TAKEN",
            fields: single("email", "A user with that email already exists."),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidScore
            | ApiError::InvalidCredentials
            | ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::DuplicateReview => StatusCode::CONFLICT,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidScore => "INVALID_SCORE",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::DuplicateReview => "DUPLICATE_REVIEW",
            ApiError::Conflict { code, .. } => *code,
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::PermissionDenied => "PERMISSION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn into_body(self) -> ErrorBody {
        let code = self.code().to_string();
        match self {
            ApiError::Validation(fields) => ErrorBody {
                code,
                message: "Request validation failed".into(),
                fields,
            },
            ApiError::InvalidScore => ErrorBody {
                code,
                message: "Score must be between 1 and 10".into(),
                fields: single("score", "Ensure this value is between 1 and 10."),
            },
            ApiError::Conflict { fields, .. } => ErrorBody {
                code,
                message: "A record with these values already exists".into(),
                fields,
            },
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorBody {
                    code,
                    message: "An unexpected error occurred".into(),
                    fields: FieldErrors::new(),
                }
            }
            other => ErrorBody {
                code,
                message: other.to_string(),
                fields: FieldErrors::new(),
            },
        }
    }
}

fn single(field: &str, message: &str) -> FieldErrors {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message.to_string()]);
    fields
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({}).", e.code),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ApiError::Validation(fields)
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation(constraint) => match constraint.as_str() {
                constraints::USERNAME => ApiError::username_taken(),
                constraints::EMAIL => ApiError::email_taken(),
                constraints::REVIEW_TITLE_AUTHOR => ApiError::DuplicateReview,
                constraints::CATEGORY_SLUG | constraints::GENRE_SLUG => ApiError::Conflict {
                    code: "CONFLICT",
                    fields: single("slug", "An object with this slug already exists."),
                },
                other => ApiError::Internal(format!("unexpected unique violation on `{other}`")),
            },
            RepoError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}
