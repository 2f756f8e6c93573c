// ABOUTME: Integration tests for Caddy route registration against a mock admin API.
// ABOUTME: Covers idempotent adds, rejected posts, timeouts and unreachable proxies.

mod support;

use bitswan_gitops::route::{CaddyClient, RouteError, RouteOutcome};
use bitswan_gitops::types::DeploymentId;
use std::time::Duration;
use support::{MockProxy, closed_port_url};
use tokio::net::TcpListener;

fn slot(name: &str) -> DeploymentId {
    DeploymentId::new(name).unwrap()
}

fn client(url: &str) -> CaddyClient {
    CaddyClient::new(url, "gitops.example.com", 8080, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn missing_route_is_added() {
    let proxy = MockProxy::start().await;
    let caddy = client(&proxy.url());

    let outcome = caddy.ensure_route(&slot("svc1"), None).await.unwrap();

    assert_eq!(outcome, RouteOutcome::Added);
    let posts = proxy.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, "/config/apps/http/servers/srv0/routes/...");

    let body: serde_json::Value = serde_json::from_str(&posts[0].body).unwrap();
    assert_eq!(body[0]["match"][0]["host"][0], "svc1.gitops.example.com");
    assert_eq!(
        body[0]["handle"][0]["routes"][0]["handle"][0]["upstreams"][0]["dial"],
        "svc1:8080"
    );
}

#[tokio::test]
async fn explicit_port_overrides_default() {
    let proxy = MockProxy::start().await;
    let caddy = client(&proxy.url());

    caddy.ensure_route(&slot("svc1"), Some(5000)).await.unwrap();

    let body: serde_json::Value = serde_json::from_str(&proxy.posts()[0].body).unwrap();
    assert_eq!(
        body[0]["handle"][0]["routes"][0]["handle"][0]["upstreams"][0]["dial"],
        "svc1:5000"
    );
}

#[tokio::test]
async fn existing_upstream_is_left_alone() {
    let proxy = MockProxy::start_with(vec!["svc1:9000", "other:8080"], None).await;
    let caddy = client(&proxy.url());

    let outcome = caddy.ensure_route(&slot("svc1"), Some(8080)).await.unwrap();

    assert_eq!(outcome, RouteOutcome::AlreadyPresent);
    assert!(proxy.posts().is_empty());
}

#[tokio::test]
async fn second_ensure_is_a_no_op() {
    let proxy = MockProxy::start().await;
    let caddy = client(&proxy.url());

    assert_eq!(
        caddy.ensure_route(&slot("svc1"), None).await.unwrap(),
        RouteOutcome::Added
    );
    assert_eq!(
        caddy.ensure_route(&slot("svc1"), None).await.unwrap(),
        RouteOutcome::AlreadyPresent
    );
    assert_eq!(proxy.posts().len(), 1);
}

#[tokio::test]
async fn slot_name_prefix_does_not_count_as_present() {
    let proxy = MockProxy::start_with(vec!["svc10:8080"], None).await;
    let caddy = client(&proxy.url());

    let outcome = caddy.ensure_route(&slot("svc1"), None).await.unwrap();
    assert_eq!(outcome, RouteOutcome::Added);
}

#[tokio::test]
async fn rejected_post_reports_status() {
    let proxy = MockProxy::start_with(Vec::new(), Some(500)).await;
    let caddy = client(&proxy.url());

    let err = caddy.ensure_route(&slot("svc1"), None).await.unwrap_err();

    match err {
        RouteError::Status {
            method,
            status,
            body,
            ..
        } => {
            assert_eq!(method, "POST");
            assert_eq!(status, 500);
            assert!(body.contains("rejected"), "{body}");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_proxy_times_out() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let caddy = CaddyClient::new(
        &format!("http://{addr}"),
        "gitops.example.com",
        8080,
        Duration::from_millis(200),
    )
    .unwrap();

    let err = caddy.upstreams().await.unwrap_err();
    assert!(matches!(err, RouteError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_proxy_is_a_connect_error() {
    let caddy = client(&closed_port_url().await);

    let err = caddy.ensure_route(&slot("svc1"), None).await.unwrap_err();
    assert!(matches!(err, RouteError::Connect { .. }), "got {err:?}");
}

#[test]
fn https_admin_url_is_rejected() {
    let err = CaddyClient::new(
        "https://caddy:2019",
        "gitops.example.com",
        8080,
        Duration::from_secs(1),
    )
    .unwrap_err();
    assert!(matches!(err, RouteError::InvalidUrl { .. }));
}
