use crate::{AppState, handlers::catalog};
use axum::{
    Router,
    routing::{delete, get},
};

/// Catalog routes: reads are public, writes need an admin.
pub fn catalog_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Categories & Genres ---
        // Addressed by slug; there is no update endpoint.
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/categories/{slug}", delete(catalog::delete_category))
        .route(
            "/genres",
            get(catalog::list_genres).post(catalog::create_genre),
        )
        .route("/genres/{slug}", delete(catalog::delete_genre))
        // --- Titles ---
        // GET /titles?name=&category=&genre=&year=
        .route(
            "/titles",
            get(catalog::list_titles).post(catalog::create_title),
        )
        .route(
            "/titles/{title_id}",
            get(catalog::get_title)
                .patch(catalog::update_title)
                .delete(catalog::delete_title),
        )
}
