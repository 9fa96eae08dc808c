//! HTTP handlers, grouped by resource.
//!
//! Handlers extract the caller (`AuthUser` when a signed-in caller is mandatory,
//! `Option<AuthUser>` otherwise), run the rule table through `permissions::authorize`
//! and translate every failure into an `ApiError`.

pub mod auth;
pub mod catalog;
pub mod reviews;
pub mod users;

/// health_check
///
/// Liveness probe. Does not touch the database.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "ops"
)]
pub async fn health_check() -> &'static str {
    "ok"
}
