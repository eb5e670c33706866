use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use cinetrack_browse::search::is_year;
use cinetrack_browse::{BrowseContext, FeedScope, FilterState, Page, SearchStrategy};
use cinetrack_core::MediaKind;
use cinetrack_core::error::ApiError;
use cinetrack_metadata::{DiscoverParams, GenreEntry};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Highest page number a session page request accepts.
pub const MAX_PAGE: u32 = 1000;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/genres/{kind}", get(get_genres))
        .route("/search", post(open_search))
        // Sessions
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", axum::routing::delete(close_session))
        .route("/sessions/{id}/pages/{page}", get(get_session_page))
        .route("/sessions/{id}/filter", put(put_session_filter))
        .route("/sessions/{id}/search", post(search_in_session))
        .route("/sessions/{id}/facets", get(get_session_facets))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    upstream: String,
    sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        upstream: state.catalog.source().name().to_string(),
        sessions: state.sessions.active_count().await,
    })
}

// ---------------------------------------------------------------------------
// Genres
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenresResponse {
    kind: MediaKind,
    genres: Vec<GenreEntry>,
}

fn parse_kind(raw: &str) -> Result<MediaKind, ApiError> {
    MediaKind::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown media kind: {raw}")))
}

async fn get_genres(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<GenresResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let map = state.catalog.directory().resolve(kind).await?;
    let genres = map
        .iter()
        .map(|(id, name)| GenreEntry {
            id: *id,
            name: name.clone(),
        })
        .collect();
    Ok(Json(GenresResponse { kind, genres }))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OpenSessionRequest {
    kind: MediaKind,
    #[serde(default)]
    genre_ids: Vec<u32>,
    #[serde(default)]
    year: Option<String>,
}

#[derive(Serialize)]
struct SessionPageResponse {
    session_id: String,
    created_at: Option<DateTime<Utc>>,
    scope: FeedScope,
    page: Page,
}

fn scope_for(body: OpenSessionRequest) -> Result<FeedScope, ApiError> {
    let year = body.year.map(|y| y.trim().to_string()).filter(|y| !y.is_empty());
    if let Some(bad) = year.as_deref().filter(|y| !is_year(y)) {
        return Err(ApiError::BadRequest(format!(
            "year must be four digits, got {bad:?}"
        )));
    }

    if year.is_none() && body.genre_ids.is_empty() {
        return Ok(FeedScope::Popular { kind: body.kind });
    }
    Ok(FeedScope::Discover {
        kind: body.kind,
        params: DiscoverParams {
            year,
            genre_ids: body.genre_ids,
            page: 1,
        },
    })
}

async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionPageResponse>), AppError> {
    let scope = scope_for(body)?;
    let context = Arc::new(BrowseContext::new(state.catalog.clone(), scope.clone()));
    let page = context.get_page(1).await?;
    let (session_id, created_at) = state.sessions.open(context).await;

    Ok((
        StatusCode::CREATED,
        Json(SessionPageResponse {
            session_id,
            created_at: Some(created_at),
            scope,
            page,
        }),
    ))
}

async fn session_context(state: &AppState, id: &str) -> Result<Arc<BrowseContext>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound("session not found".into()))
}

async fn get_session_page(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Json<SessionPageResponse>, AppError> {
    if page > MAX_PAGE {
        return Err(
            ApiError::BadRequest(format!("page must be at most {MAX_PAGE}, got {page}")).into(),
        );
    }
    let context = session_context(&state, &id).await?;
    let page = context.get_page(page).await?;
    Ok(Json(SessionPageResponse {
        session_id: id,
        created_at: None,
        scope: context.scope().await,
        page,
    }))
}

async fn put_session_filter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(filter): Json<FilterState>,
) -> Result<Json<SessionPageResponse>, AppError> {
    let context = session_context(&state, &id).await?;
    let page = context.apply_filter(filter).await?;
    Ok(Json(SessionPageResponse {
        session_id: id,
        created_at: None,
        scope: context.scope().await,
        page,
    }))
}

#[derive(Serialize)]
struct FacetsResponse {
    session_id: String,
    genres: Vec<String>,
}

async fn get_session_facets(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FacetsResponse>, AppError> {
    let context = session_context(&state, &id).await?;
    Ok(Json(FacetsResponse {
        session_id: id,
        genres: context.facets().await,
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.sessions.close(&id).await {
        return Err(ApiError::NotFound("session not found".into()).into());
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchRequest {
    term: String,
}

#[derive(Serialize)]
struct SearchResponse {
    session_id: String,
    term: String,
    strategy: Option<SearchStrategy>,
    page: Page,
}

async fn open_search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<(StatusCode, Json<SearchResponse>), AppError> {
    let context = Arc::new(BrowseContext::for_search(state.catalog.clone()));
    let results = context.search(&body.term).await?;
    let (session_id, _) = state.sessions.open(context).await;

    Ok((
        StatusCode::CREATED,
        Json(SearchResponse {
            session_id,
            term: results.term,
            strategy: results.strategy,
            page: results.page,
        }),
    ))
}

async fn search_in_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let context = session_context(&state, &id).await?;
    let results = context.search(&body.term).await?;
    Ok(Json(SearchResponse {
        session_id: id,
        term: results.term,
        strategy: results.strategy,
        page: results.page,
    }))
}
