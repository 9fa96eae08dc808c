use crate::{AppState, handlers::auth};
use axum::{Router, routing::post};

/// Public routes of the signup flow. No credentials are read on either.
pub fn auth_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /auth/signup
        // Creates the account (or finds the exact username/email pair) and sends a code.
        .route("/auth/signup", post(auth::signup))
        // POST /auth/token
        // Trades the latest confirmation code for a bearer token.
        .route("/auth/token", post(auth::obtain_token))
}
