use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod permissions;
pub mod rating;
pub mod repository;
pub mod seed;
pub mod services;
pub mod validation;

// One router per resource group.
pub mod routes;
use routes::{auth as auth_routes, catalog, reviews, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use notifier::{MockNotifier, NotifierState};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::auth::signup, handlers::auth::obtain_token,
        handlers::users::get_me, handlers::users::update_me, handlers::users::list_users,
        handlers::users::create_user, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user,
        handlers::catalog::list_categories, handlers::catalog::create_category,
        handlers::catalog::delete_category, handlers::catalog::list_genres,
        handlers::catalog::create_genre, handlers::catalog::delete_genre,
        handlers::catalog::list_titles, handlers::catalog::get_title,
        handlers::catalog::create_title, handlers::catalog::update_title,
        handlers::catalog::delete_title,
        handlers::reviews::list_reviews, handlers::reviews::create_review,
        handlers::reviews::get_review, handlers::reviews::update_review,
        handlers::reviews::delete_review, handlers::reviews::list_comments,
        handlers::reviews::create_comment, handlers::reviews::get_comment,
        handlers::reviews::update_comment, handlers::reviews::delete_comment
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::Term, models::TitleView,
            models::Review, models::Comment, models::SignUpRequest, models::TokenRequest,
            models::TokenResponse, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateTermRequest, models::CreateTitleRequest, models::UpdateTitleRequest,
            models::CreateReviewRequest, models::UpdateReviewRequest,
            models::CreateCommentRequest, error::ErrorBody,
        )
    ),
    tags(
        (name = "catalog-api", description = "Titles, reviews and ratings API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler: the store, the confirmation
/// code channel and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Delivery channel for signup confirmation codes.
    pub notifier: NotifierState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors (notably `AuthUser`) pull single components out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for NotifierState {
    fn from_ref(app_state: &AppState) -> NotifierState {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the API under `/api/v1`, the health probe and Swagger UI, then wraps
/// everything in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(auth_routes::auth_routes())
        .merge(users::user_routes())
        .merge(catalog::catalog_routes())
        .merge(reviews::review_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health_check))
        .nest(API_PREFIX, api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its `x-request-id` so every log line of the
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
