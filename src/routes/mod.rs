/// Router Module Index
///
/// One router per resource group, merged under `/api/v1` by `create_router`.
/// Access control is not applied at this level: every handler receives the caller
/// (`AuthUser` or `Option<AuthUser>`) and consults `permissions::authorize`, so the
/// same path can serve anonymous reads and admin-only writes.

/// Signup and token exchange.
pub mod auth;

/// Own profile and the admin user directory.
pub mod users;

/// Categories, genres and titles.
pub mod catalog;

/// Reviews and comments nested under titles.
pub mod reviews;
