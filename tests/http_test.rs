mod common;

use common::{BrokenLayout, StubLayout, StubTarget};
use gom::report::GraphLayout;
use gom::server::{AppState, router};
use std::io::Read;
use std::sync::Arc;

struct Reply {
    status: u16,
    content_type: String,
    body: String,
}

async fn spawn_server(target: &Arc<StubTarget>, layout: Box<dyn GraphLayout>) -> String {
    let state = Arc::new(AppState {
        registry: common::registry(target),
        layout,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn get(url: String) -> Reply {
    tokio::task::spawn_blocking(move || {
        let response = match ureq::get(&url).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => panic!("{}: {}", url, e),
        };
        let status = response.status();
        let content_type = response.content_type().to_string();
        let mut body = String::new();
        response.into_reader().read_to_string(&mut body).unwrap();
        Reply {
            status,
            content_type,
            body,
        }
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_profile_is_404() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=bogus", base)).await;
    assert_eq!(reply.status, 404);
    let reply = get(format!("{}/p", base)).await;
    assert_eq!(reply.status, 404);
    assert_eq!(target.fetches(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_filter_is_400_without_fetch() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap&filter=%28%5B", base)).await;
    assert_eq!(reply.status, 400);
    assert!(reply.body.contains("(["));
    assert_eq!(target.fetches(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_heap_report_json() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap&cumsort=1", base)).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");

    let items: Vec<serde_json::Value> = serde_json::from_str(&reply.body).unwrap();
    let names: Vec<&str> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["main.main", "main.decode", "main.encode", "bytes.Grow"]);
    assert_eq!(items[0]["cum_perc"], 100.0);
    assert_eq!(items[0]["flat"], "0B");

    // Served from cache
    get(format!("{}/p?profile=heap", base)).await;
    assert_eq!(target.fetches(), 1);
    get(format!("{}/p?profile=heap&force=true", base)).await;
    assert_eq!(target.fetches(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_matching_filter_is_empty_list() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap&filter=foo", base)).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body.trim(), "[]");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_filter_keeps_callers() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap&filter=Grow", base)).await;
    let items: Vec<serde_json::Value> = serde_json::from_str(&reply.body).unwrap();
    let mut names: Vec<&str> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
    names.sort();
    assert_eq!(names, ["bytes.Grow", "main.encode", "main.main"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_is_500() {
    let target = StubTarget::new();
    target.set_failing(true);
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap", base)).await;
    assert_eq!(reply.status, 500);
    assert!(reply.body.contains("connection refused"));

    let reply = get(format!("{}/stats", base)).await;
    assert_eq!(reply.status, 500);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_image_and_text_outputs() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/p?profile=heap&img=t", base)).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "image/svg+xml");
    assert!(reply.body.starts_with("<svg>"));

    let reply = get(format!("{}/p?profile=heap&text=1", base)).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "text/plain");
    assert!(reply.body.starts_with("Type: inuse_space"));
    assert!(reply.body.contains("main.decode"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_layout_failure_is_500() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(BrokenLayout)).await;

    let reply = get(format!("{}/p?profile=heap&img=1", base)).await;
    assert_eq!(reply.status, 500);
    assert!(reply.body.contains("command not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stats_and_kinds() {
    let target = StubTarget::new();
    let base = spawn_server(&target, Box::new(StubLayout)).await;

    let reply = get(format!("{}/stats", base)).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");
    assert_eq!(reply.body, common::STATS_BODY);

    let reply = get(format!("{}/kinds", base)).await;
    let kinds: Vec<String> = serde_json::from_str(&reply.body).unwrap();
    assert!(kinds.iter().any(|k| k == "heap"));
    assert!(kinds.iter().any(|k| k == "profile"));
}
