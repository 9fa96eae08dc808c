use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        CreateTermRequest, CreateTitleRequest, NewTitle, SearchFilter, Term, TermKind,
        TitleChanges, TitleFilter, TitleView, UpdateTitleRequest,
    },
    permissions::{Operation, Resource, authorize},
    validation::ensure_year_not_in_future,
};

fn resource_of(kind: TermKind) -> Resource {
    match kind {
        TermKind::Category => Resource::Category,
        TermKind::Genre => Resource::Genre,
    }
}

// --- Categories & Genres (shared bodies) ---

async fn list_terms(
    state: &AppState,
    actor: Option<&AuthUser>,
    kind: TermKind,
    filter: SearchFilter,
) -> Result<Json<Vec<Term>>, ApiError> {
    authorize(actor, resource_of(kind), Operation::List, None)?;
    Ok(Json(state.repo.list_terms(kind, filter.search).await?))
}

async fn create_term(
    state: &AppState,
    actor: Option<&AuthUser>,
    kind: TermKind,
    payload: CreateTermRequest,
) -> Result<(StatusCode, Json<Term>), ApiError> {
    authorize(actor, resource_of(kind), Operation::Create, None)?;
    payload.validate()?;
    let term = state.repo.create_term(kind, payload).await?;
    tracing::info!(kind = kind.label(), slug = %term.slug, "created");
    Ok((StatusCode::CREATED, Json(term)))
}

async fn delete_term(
    state: &AppState,
    actor: Option<&AuthUser>,
    kind: TermKind,
    slug: &str,
) -> Result<StatusCode, ApiError> {
    authorize(actor, resource_of(kind), Operation::Delete, None)?;
    if !state.repo.delete_term(kind, slug).await? {
        return Err(ApiError::NotFound(kind.label()));
    }
    tracing::info!(kind = kind.label(), slug, "deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// list_categories
///
/// [Public Route] Categories ordered by name; `?search=` filters by name substring.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(SearchFilter),
    responses((status = 200, description = "Categories", body = [Term])),
    tag = "catalog"
)]
pub async fn list_categories(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Term>>, ApiError> {
    list_terms(&state, actor.as_ref(), TermKind::Category, filter).await
}

/// create_category
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateTermRequest,
    responses(
        (status = 201, description = "Created", body = Term),
        (status = 400, description = "Invalid or duplicate slug", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn create_category(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTermRequest>,
) -> Result<(StatusCode, Json<Term>), ApiError> {
    create_term(&state, actor.as_ref(), TermKind::Category, payload).await
}

/// delete_category
///
/// [Admin Route] Titles in the category are kept and lose their category.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such category", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn delete_category(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_term(&state, actor.as_ref(), TermKind::Category, &slug).await
}

/// list_genres
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/genres",
    params(SearchFilter),
    responses((status = 200, description = "Genres", body = [Term])),
    tag = "catalog"
)]
pub async fn list_genres(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Term>>, ApiError> {
    list_terms(&state, actor.as_ref(), TermKind::Genre, filter).await
}

/// create_genre
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/genres",
    request_body = CreateTermRequest,
    responses(
        (status = 201, description = "Created", body = Term),
        (status = 400, description = "Invalid or duplicate slug", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn create_genre(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTermRequest>,
) -> Result<(StatusCode, Json<Term>), ApiError> {
    create_term(&state, actor.as_ref(), TermKind::Genre, payload).await
}

/// delete_genre
///
/// [Admin Route] The genre is unlinked from every title.
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such genre", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn delete_genre(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_term(&state, actor.as_ref(), TermKind::Genre, &slug).await
}

// --- Titles ---

fn missing_slug(field: &str, slug: &str) -> ApiError {
    ApiError::field(field, format!("Object with slug={slug} does not exist."))
}

/// Resolves a category slug to its id, as a field error on `category`.
async fn resolve_category(state: &AppState, slug: &str) -> Result<i64, ApiError> {
    state
        .repo
        .get_term(TermKind::Category, slug)
        .await?
        .map(|term| term.id)
        .ok_or_else(|| missing_slug("category", slug))
}

async fn resolve_genres(state: &AppState, slugs: &[String]) -> Result<Vec<i64>, ApiError> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let term = state
            .repo
            .get_term(TermKind::Genre, slug)
            .await?
            .ok_or_else(|| missing_slug("genre", slug))?;
        ids.push(term.id);
    }
    Ok(ids)
}

async fn load_title(state: &AppState, id: i64) -> Result<TitleView, ApiError> {
    state
        .repo
        .get_title(id)
        .await?
        .ok_or(ApiError::NotFound("title"))
}

/// list_titles
///
/// [Public Route] Titles with their computed rating. Filters: `name` (case-insensitive
/// exact), `category` and `genre` (slugs), `year`.
#[utoipa::path(
    get,
    path = "/api/v1/titles",
    params(TitleFilter),
    responses((status = 200, description = "Titles", body = [TitleView])),
    tag = "catalog"
)]
pub async fn list_titles(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Query(filter): Query<TitleFilter>,
) -> Result<Json<Vec<TitleView>>, ApiError> {
    authorize(actor.as_ref(), Resource::Title, Operation::List, None)?;
    Ok(Json(state.repo.list_titles(filter).await?))
}

/// get_title
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 200, description = "Title", body = TitleView),
        (status = 404, description = "No such title", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn get_title(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> Result<Json<TitleView>, ApiError> {
    authorize(actor.as_ref(), Resource::Title, Operation::Retrieve, None)?;
    Ok(Json(load_title(&state, title_id).await?))
}

/// create_title
///
/// [Admin Route] Category and genres are given by slug and must already exist.
#[utoipa::path(
    post,
    path = "/api/v1/titles",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Created", body = TitleView),
        (status = 400, description = "Invalid fields or unknown slugs", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn create_title(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<TitleView>), ApiError> {
    authorize(actor.as_ref(), Resource::Title, Operation::Create, None)?;
    payload.validate()?;
    ensure_year_not_in_future(payload.year)?;

    let category_id = match payload.category.as_deref() {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&state, &payload.genre).await?;

    let title = state
        .repo
        .create_title(NewTitle {
            name: payload.name,
            year: payload.year,
            description: payload.description.unwrap_or_default(),
            category_id,
            genre_ids,
        })
        .await?;
    tracing::info!(title_id = title.id, name = %title.name, "title created");
    Ok((StatusCode::CREATED, Json(title)))
}

/// update_title
///
/// [Admin Route] Partial update. A `genre` list replaces the current genres.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Updated", body = TitleView),
        (status = 400, description = "Invalid fields or unknown slugs", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such title", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn update_title(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<TitleView>, ApiError> {
    load_title(&state, title_id).await?;
    authorize(actor.as_ref(), Resource::Title, Operation::Update, None)?;
    payload.validate()?;
    ensure_year_not_in_future(payload.year)?;

    let category_id = match payload.category.as_deref() {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };
    let genre_ids = match payload.genre.as_deref() {
        Some(slugs) => Some(resolve_genres(&state, slugs).await?),
        None => None,
    };

    let title = state
        .repo
        .update_title(
            title_id,
            TitleChanges {
                name: payload.name,
                year: payload.year,
                description: payload.description,
                category_id,
                genre_ids,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("title"))?;
    Ok(Json(title))
}

/// delete_title
///
/// [Admin Route] Removes the title with its reviews and their comments.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "No such title", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn delete_title(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_title(&state, title_id).await?;
    authorize(actor.as_ref(), Resource::Title, Operation::Delete, None)?;
    if !state.repo.delete_title(title_id).await? {
        return Err(ApiError::NotFound("title"));
    }
    tracing::info!(title_id, "title deleted");
    Ok(StatusCode::NO_CONTENT)
}
