use super::*;
use crate::fetcher::Fetcher;
use crate::fetcher::test_helpers::MockFetcher;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;


/// Router over a scripted fetcher, writing into a fresh temp dir
fn create_test_app(fetcher: Arc<MockFetcher>) -> (Router, Arc<Config>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().join("videos");
    std::fs::create_dir_all(&config.download.videos_dir).unwrap();
    let config = Arc::new(config);

    let app = create_router(create_test_orchestrator(fetcher, &config), config.clone());
    (app, config, temp_dir)
}

fn create_test_orchestrator(
    fetcher: Arc<MockFetcher>,
    config: &Config,
) -> Arc<DownloadOrchestrator> {
    Arc::new(DownloadOrchestrator::new(
        fetcher as Arc<dyn Fetcher>,
        config,
    ))
}

fn idle_fetcher() -> Arc<MockFetcher> {
    MockFetcher::succeeding("", "unused.mp4")
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns_and_shuts_down() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().to_path_buf();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let shutdown = CancellationToken::new();
    let orchestrator = create_test_orchestrator(idle_fetcher(), &config);

    let api_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { start_api_server(orchestrator, config, shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server should stop after shutdown is requested")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_header_on_every_endpoint() {
    let (app, _config, _temp_dir) = create_test_app(idle_fetcher());

    for uri in ["/ping", "/health", "/library"] {
        let request = Request::builder()
            .uri(uri)
            .header("Origin", "http://localhost:8080")
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*",
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_preflight_returns_no_content() {
    let (app, _config, _temp_dir) = create_test_app(idle_fetcher());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/download-stream")
        .header("Origin", "http://localhost:8080")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-methods")
    );
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_bare_options_returns_no_content() {
    let (app, _config, _temp_dir) = create_test_app(idle_fetcher());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/download")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_cors_disabled() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().to_path_buf();
    config.server.cors_enabled = false;
    let config = Arc::new(config);

    let app = create_router(create_test_orchestrator(idle_fetcher(), &config), config);

    let request = Request::builder()
        .uri("/ping")
        .header("Origin", "http://localhost:8080")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().to_path_buf();
    config.server.cors_origins = vec!["http://localhost:8080".to_string()];
    let config = Arc::new(config);

    let app = create_router(create_test_orchestrator(idle_fetcher(), &config), config);

    let request = Request::builder()
        .uri("/ping")
        .header("Origin", "http://localhost:8080")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:8080"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found_without_static_dir() {
    let (app, _config, _temp_dir) = create_test_app(idle_fetcher());

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_fallback_serves_front_end() {
    let temp_dir = tempdir().unwrap();
    let static_dir = temp_dir.path().join("public");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>vidpull</h1>").unwrap();

    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().join("videos");
    config.server.static_dir = Some(static_dir);
    let config = Arc::new(config);

    let app = create_router(create_test_orchestrator(idle_fetcher(), &config), config);

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<h1>vidpull</h1>");

    // API routes still win over the fallback
    let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(body_string(response).await.contains("\"ok\":true"));
}

#[tokio::test]
async fn test_swagger_ui_enabled() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.videos_dir = temp_dir.path().to_path_buf();
    config.server.swagger_ui = true;
    let config = Arc::new(config);

    let app = create_router(create_test_orchestrator(idle_fetcher(), &config), config);

    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
