//! HTTP server for arxiv-rec
//!
//! Exposes semantic search and recommendations over HTTP using axum.
//!
//! # Endpoints
//!
//! - `GET /search?q=...&k=5` - Embed a free-text query, return nearest papers
//! - `GET /recommend?item_id=...&k=5` - Papers nearest a stored paper
//! - `GET /health` - Server health and index stats
//!
//! # Concurrency Model
//!
//! All state is built once in `main` and shared as an immutable
//! `Arc<AppState>`. The index never mutates while serving (builds happen
//! offline through the CLI), so searches run concurrently without locks.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::corpus::{verify_alignment, CorpusError, PaperRecord};
use crate::embed::Embedder;
use crate::index::{VectorIndex, NO_RESULT};

/// Hard cap on requested result counts.
pub const MAX_K: usize = 50;

/// Shared application state, constructed once at startup.
pub struct AppState {
    pub index: VectorIndex,
    pub papers: Vec<PaperRecord>,
    pub row_lookup: HashMap<String, usize>,
    pub embedder: Arc<dyn Embedder>,
}

impl AppState {
    /// Assemble serving state, enforcing the index/metadata alignment
    /// invariant before a single request is answered.
    pub fn new(
        index: VectorIndex,
        papers: Vec<PaperRecord>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, CorpusError> {
        verify_alignment(index.len(), papers.len())?;

        let row_lookup = papers
            .iter()
            .enumerate()
            .map(|(row, p)| (p.id.clone(), row))
            .collect();

        Ok(Self {
            index,
            papers,
            row_lookup,
            embedder,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub item_id: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    5
}

/// One retrieved/recommended paper
#[derive(Debug, Serialize, Deserialize)]
pub struct PaperHit {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: String,
    /// Cosine similarity to the query (higher = more similar)
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub results: Vec<PaperHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub vectors_loaded: usize,
    pub dimension: usize,
    pub papers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn validate_k(k: usize) -> Result<(), ApiError> {
    if k == 0 || k > MAX_K {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("k must be between 1 and {}", MAX_K),
        ));
    }
    Ok(())
}

/// Join raw (row, score) pairs with metadata, skipping sentinel slots.
fn format_results(state: &AppState, raw: &[(i64, f32)]) -> Vec<PaperHit> {
    raw.iter()
        .filter(|(row, _)| *row != NO_RESULT && (*row as usize) < state.papers.len())
        .map(|&(row, score)| {
            let paper = &state.papers[row as usize];
            PaperHit {
                id: paper.id.clone(),
                title: paper.title.clone(),
                abstract_text: paper.abstract_text.clone(),
                categories: paper.categories.clone(),
                score,
            }
        })
        .collect()
}

/// GET /search - Embed the query text and return the nearest papers
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultsResponse>, ApiError> {
    if params.q.trim().chars().count() < 3 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "q must be at least 3 characters",
        ));
    }
    validate_k(params.k)?;

    let query_vec = state
        .embedder
        .embed_query(params.q.trim())
        .await
        .map_err(|e| {
            api_error(
                StatusCode::BAD_GATEWAY,
                format!("embedding service error: {}", e),
            )
        })?;

    let raw = state.index.search(&query_vec, params.k).map_err(|e| {
        // A mismatch here means the embedding service changed shape under us.
        api_error(StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    Ok(Json(ResultsResponse {
        results: format_results(&state, &raw),
    }))
}

/// GET /recommend - Return the papers nearest a stored paper
///
/// Searches with the stored vector of `item_id` and `k + 1` so the paper
/// itself can be dropped from its own results.
async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<ResultsResponse>, ApiError> {
    validate_k(params.k)?;

    let row = *state.row_lookup.get(&params.item_id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("item id {} not found", params.item_id),
        )
    })?;

    let query_vec = state
        .index
        .get(row)
        .ok_or_else(|| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "row lookup points past the index",
            )
        })?
        .to_vec();

    let raw = state
        .index
        .search(&query_vec, params.k + 1)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let filtered: Vec<(i64, f32)> = raw
        .into_iter()
        .filter(|(idx, _)| *idx != row as i64 && *idx != NO_RESULT)
        .take(params.k)
        .collect();

    Ok(Json(ResultsResponse {
        results: format_results(&state, &filtered),
    }))
}

/// GET /health - Server health and index stats
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        vectors_loaded: state.index.len(),
        dimension: state.index.dimension(),
        papers: state.papers.len(),
    })
}

/// Create the axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(search))
        .route("/recommend", get(recommend))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(state: Arc<AppState>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let router = create_router(state);

    tracing::info!("starting arxiv-rec server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
