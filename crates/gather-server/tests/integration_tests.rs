//! Integration tests for gather-server

use axum::{http::StatusCode, routing::get, Router};
use gather_server::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Start a stand-in for the instance metadata service
async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/latest/meta-data/hostname", get(|| async { "ip-10-0-0-7" }))
        .route(
            "/latest/meta-data/placement/availability-zone",
            get(|| async { "eu-west-1b" }),
        )
        .route(
            "/latest/meta-data/iam/info",
            get(|| async { (StatusCode::NOT_FOUND, "no role") }),
        )
        .route(
            "/latest/meta-data/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "too late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn upstream_fetcher(upstream: SocketAddr) -> HttpFetcher {
    HttpFetcher::new(
        &format!("http://{upstream}/latest/meta-data/"),
        Duration::from_secs(5),
    )
    .unwrap()
}

/// Serve the registry on a free port and wait until it accepts connections
async fn start_server(registry: PageRegistry, context: AppContext) -> (SocketAddr, CancellationToken) {
    let shutdown = CancellationToken::new();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let token = shutdown.clone();
    tokio::spawn(async move {
        Axum::default()
            .serve(
                registry,
                context,
                token,
                Some(move |addr: SocketAddr| {
                    let _ = ready_tx.send(addr);
                }),
            )
            .await
    });
    (ready_rx.await.unwrap(), shutdown)
}

fn aws_registry() -> PageRegistry {
    PageRegistry::new()
        .page(Page::new("aws", PageKind::Metadata))
        .unwrap()
        .page(Page::new("favicon.ico", PageKind::NotFound).unindexed())
        .unwrap()
}

async fn get_text(url: String) -> (u16, String) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_sections_rendered_in_requested_order() {
    let upstream = start_upstream().await;
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream))).with_sections([
        "placement/availability-zone",
        "iam/info",
        "hostname",
    ]);
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let (status, body) = get_text(format!("http://{addr}/aws")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<title>AWS Info Dumper</title>"));

    let zone = body.find("<h3>placement/availability-zone</h3>\neu-west-1b").unwrap();
    let iam = body.find("<h3 class=\"error\">iam/info</h3>").unwrap();
    let host = body.find("<h3>hostname</h3>\nip-10-0-0-7").unwrap();
    assert!(zone < iam && iam < host);
    assert!(!body.contains("terminated early"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_slow_section_times_out_without_holding_the_page() {
    let upstream = start_upstream().await;
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream)))
        .with_sections(["hostname", "slow"])
        .with_gather_timeout(Duration::from_millis(300));
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let started = Instant::now();
    let (status, body) = get_text(format!("http://{addr}/aws")).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(status, 200);
    assert!(body.contains("<h3>hostname</h3>\nip-10-0-0-7"));
    assert!(!body.contains("too late"));
    assert!(body.contains("<h3 class=\"error\">timeout</h3>"));
    assert!(body.contains("terminated early"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_json_report_lists_timed_out_sections() {
    let upstream = start_upstream().await;
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream)))
        .with_sections(["slow", "hostname", "iam/info"])
        .with_gather_timeout(Duration::from_millis(300));
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/aws.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["timed_out"], serde_json::json!(["slow"]));
    let sections = body["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["key"], "hostname");
    assert_eq!(sections[0]["status"], "success");
    assert_eq!(sections[0]["body"], "ip-10-0-0-7");
    assert_eq!(sections[1]["key"], "iam/info");
    assert_eq!(sections[1]["status"], "failure");

    shutdown.cancel();
}

#[tokio::test]
async fn test_unreachable_upstream_reports_failures() {
    // Nothing listens on the discard port
    let fetcher = HttpFetcher::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
    let context = AppContext::new(Arc::new(fetcher))
        .with_sections(["hostname"])
        .with_gather_timeout(Duration::from_secs(2));
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let (status, body) = get_text(format!("http://{addr}/aws")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<h3 class=\"error\">hostname</h3>"));
    assert!(!body.contains("terminated early"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_metadata_file_replaces_gathering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("task.json");
    std::fs::write(&path, r#"{"Cluster":"demo"}"#).unwrap();

    // Upstream would fail every key; the file must win
    let fetcher = HttpFetcher::new("http://127.0.0.1:9/", Duration::from_secs(1)).unwrap();
    let context = AppContext::new(Arc::new(fetcher)).with_metadata_file(Some(path));
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let (status, body) = get_text(format!("http://{addr}/aws")).await;
    assert_eq!(status, 200);
    assert!(body.contains("ECS metadata from file"));
    assert!(body.contains("{&#34;Cluster&#34;:&#34;demo&#34;}"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_index_and_not_found_pages() {
    let upstream = start_upstream().await;
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream)));
    let (addr, shutdown) = start_server(aws_registry(), context).await;

    let (status, body) = get_text(format!("http://{addr}/")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<a href=\"aws\">aws</a>"));
    assert!(!body.contains("favicon"));

    let (status, body) = get_text(format!("http://{addr}/favicon.ico")).await;
    assert_eq!(status, 404);
    assert_eq!(body, "page not found");

    let (status, _) = get_text(format!("http://{addr}/elsewhere")).await;
    assert_eq!(status, 404);

    shutdown.cancel();
}

#[tokio::test]
async fn test_poetry_directory_served_without_dotfiles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ode.txt"), "O fan-out, O deadline").unwrap();
    std::fs::write(dir.path().join(".secret"), "hidden").unwrap();

    let upstream = start_upstream().await;
    let registry = aws_registry()
        .page(
            Page::new("poetry/", PageKind::StaticDir(dir.path().to_path_buf()))
                .only_if(Precondition::DirectoryExists(dir.path().to_path_buf())),
        )
        .unwrap()
        .resolve(&NilLogger);
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream)));
    let (addr, shutdown) = start_server(registry, context).await;

    let (status, body) = get_text(format!("http://{addr}/poetry/ode.txt")).await;
    assert_eq!(status, 200);
    assert_eq!(body, "O fan-out, O deadline");

    for hidden in [".secret", "%2esecret", "%2Esecret"] {
        let (status, body) = get_text(format!("http://{addr}/poetry/{hidden}")).await;
        assert_eq!(status, 403, "{hidden}");
        assert_ne!(body, "hidden");
    }

    let (_, index) = get_text(format!("http://{addr}/")).await;
    assert!(index.contains("<a href=\"poetry\">poetry</a>"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_missing_poetry_directory_skips_page() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent");

    let upstream = start_upstream().await;
    let registry = aws_registry()
        .page(
            Page::new("poetry/", PageKind::StaticDir(absent.clone()))
                .only_if(Precondition::DirectoryExists(absent)),
        )
        .unwrap()
        .resolve(&NilLogger);
    let context = AppContext::new(Arc::new(upstream_fetcher(upstream)));
    let (addr, shutdown) = start_server(registry, context).await;

    let (status, _) = get_text(format!("http://{addr}/poetry/ode.txt")).await;
    assert_eq!(status, 404);

    let (_, index) = get_text(format!("http://{addr}/")).await;
    assert!(!index.contains("poetry"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_collector_with_http_fetcher() {
    let upstream = start_upstream().await;
    let keys = vec![
        "hostname".to_string(),
        "slow".to_string(),
        "missing/key".to_string(),
    ];
    let deadline = Deadline::after(Duration::from_millis(300));

    let result = ParallelCollector::new()
        .run(&keys, Arc::new(upstream_fetcher(upstream)), &deadline)
        .await;

    assert_eq!(
        result.get(&keys[0]).and_then(FetchOutcome::payload),
        Some(&b"ip-10-0-0-7"[..])
    );
    assert_eq!(
        result.get(&keys[2]).and_then(FetchOutcome::error),
        Some(&FetchError::Status { status: 404 })
    );
    assert_eq!(result.missing(&keys), vec![&keys[1]]);
}
