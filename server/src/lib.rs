use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wikidex_core::persist::{publish, IndexPaths};
use wikidex_core::{build_from_corpus, create_provider, SearchConfig, SearchHit, SearchProvider, SearchSource};

const INDEX_CACHE: &str = "public, max-age=60, stale-while-revalidate=600";
const FALLBACK_CACHE: &str = "no-cache";

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct ReindexResponse {
    #[serde(rename = "N")]
    pub num_docs: u32,
    pub terms: usize,
    pub snapshot: String,
}

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn SearchProvider>,
    pub config: Arc<SearchConfig>,
    pub admin_token: Option<String>,
    rebuild_lock: Arc<Mutex<()>>,
}

pub fn build_app(config: SearchConfig, admin_token: Option<String>) -> Result<Router> {
    let provider = create_provider(&config);
    Ok(build_app_with_provider(config, provider, admin_token))
}

pub fn build_app_with_provider(config: SearchConfig, provider: Arc<dyn SearchProvider>, admin_token: Option<String>) -> Router {
    let app_state = AppState { provider, config: Arc::new(config), admin_token, rebuild_lock: Arc::new(Mutex::new(())) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", get(search_handler))
        .route("/admin/reindex", post(reindex_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Always 200: an empty query, a missing index or a failed worker all yield `[]` or fallback hits.
pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let start = std::time::Instant::now();
    let q = params.q.trim().to_string();
    if q.is_empty() {
        return (StatusCode::OK, Json(Vec::<SearchHit>::new())).into_response();
    }

    let provider = state.provider.clone();
    let query = q.clone();
    let (hits, source) = match tokio::task::spawn_blocking(move || provider.search(&query)).await {
        Ok(results) => (results.hits, results.source),
        Err(err) => {
            tracing::error!(error = %err, "search task failed");
            (Vec::new(), SearchSource::Fallback)
        }
    };

    let cache = match source {
        SearchSource::Index => INDEX_CACHE,
        SearchSource::Fallback => FALLBACK_CACHE,
    };
    tracing::info!(q = %q, count = hits.len(), source = ?source, ms = start.elapsed().as_millis() as u64, "search");
    ([(header::CACHE_CONTROL, HeaderValue::from_static(cache))], Json(hits)).into_response()
}

/// Rebuild the index from the corpus, publish it, and swap the provider's snapshots.
async fn reindex_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ReindexResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let task = tokio::task::spawn_blocking(move || -> Result<ReindexResponse> {
        let _guard = state.rebuild_lock.lock();
        let mut index = build_from_corpus(&state.config.corpus);
        index.manifest.created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .ok();
        let snapshot = publish(&IndexPaths::new(&state.config.index_dir), &index)?;
        state.provider.refresh()?;
        Ok(ReindexResponse {
            num_docs: index.manifest.num_docs,
            terms: index.num_terms(),
            snapshot: snapshot.name(),
        })
    });
    match task.await {
        Ok(Ok(resp)) => Ok(Json(resp)),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "reindex failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("reindex failed: {err:#}")))
        }
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, format!("reindex task failed: {err}"))),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
