use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// User directory routes. All require a signed-in caller; everything except `/users/me`
/// and reading one's own record is admin-only.
pub fn user_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PATCH /users/me
        // Registered before `{username}`; "me" can never be a username.
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
