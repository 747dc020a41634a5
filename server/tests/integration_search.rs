use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;
use wikidex_core::persist::{publish, IndexPaths};
use wikidex_core::{build_from_corpus, CorpusConfig, SearchConfig, SearchMode};

fn write_corpus(root: &Path) {
    fs::create_dir_all(root.join("guide")).unwrap();
    fs::create_dir_all(root.join("common")).unwrap();
    fs::write(root.join("guide/rust.html"), "<title>Rust</title><p>rust rust rust systems programming</p>").unwrap();
    fs::write(root.join("guide/learn.html"), "<title>Learning</title><p>learning rust slowly</p>").unwrap();
    fs::write(root.join("common/nav.html"), "<p>rust rust rust rust navigation</p>").unwrap();
}

fn config(root: &Path, mode: SearchMode) -> SearchConfig {
    SearchConfig {
        corpus: CorpusConfig::new(root.join("wiki")).with_exclude(["common"]),
        index_dir: root.join("index"),
        mode,
    }
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let cache = resp.headers().get(header::CACHE_CONTROL).map(|v| v.to_str().unwrap().to_string());
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, cache, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("wiki"));
    let cfg = config(dir.path(), SearchMode::Index);
    publish(&IndexPaths::new(&cfg.index_dir), &build_from_corpus(&cfg.corpus)).unwrap();
    let app = server::build_app(cfg, None).unwrap();

    let (status, cache, json) = call(app, get("/api/search?q=rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("public, max-age=60, stale-while-revalidate=600"));
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["path"], "guide/rust.html");
    assert_eq!(arr[0]["title"], "Rust");
    assert_eq!(arr[1]["path"], "guide/learn.html");
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn empty_or_missing_query_is_empty_array() {
    let dir = tempdir().unwrap();
    let app = server::build_app(config(dir.path(), SearchMode::Index), None).unwrap();

    for uri in ["/api/search?q=", "/api/search?q=%20%20", "/api/search"] {
        let (status, _, json) = call(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json, serde_json::json!([]), "{uri}");
    }
}

#[tokio::test]
async fn falls_back_to_linear_scan_without_index() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("wiki"));
    let app = server::build_app(config(dir.path(), SearchMode::Index), None).unwrap();

    let (status, cache, json) = call(app, get("/api/search?q=rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("no-cache"));
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["path"], "guide/rust.html");
    assert_eq!(arr[0]["score"], 4.0);
}

#[tokio::test]
async fn reindex_requires_token_and_swaps_snapshot() {
    let dir = tempdir().unwrap();
    let wiki = dir.path().join("wiki");
    write_corpus(&wiki);
    let cfg = config(dir.path(), SearchMode::Index);
    publish(&IndexPaths::new(&cfg.index_dir), &build_from_corpus(&cfg.corpus)).unwrap();
    let app = server::build_app(cfg, Some("secret".into())).unwrap();

    let (_, _, json) = call(app.clone(), get("/api/search?q=zeppelin")).await;
    assert_eq!(json, serde_json::json!([]));

    fs::write(wiki.join("guide/new.html"), "<title>New</title><p>zeppelin</p>").unwrap();

    let denied = Request::post("/admin/reindex").header("X-ADMIN-TOKEN", "wrong").body(Body::empty()).unwrap();
    let (status, _, _) = call(app.clone(), denied).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ok = Request::post("/admin/reindex").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _, json) = call(app.clone(), ok).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["N"], 3);
    assert_eq!(json["snapshot"], "gen-000002");

    let (_, _, json) = call(app, get("/api/search?q=zeppelin")).await;
    assert_eq!(json[0]["path"], "guide/new.html");
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let app = server::build_app(config(dir.path(), SearchMode::Live), None).unwrap();
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
