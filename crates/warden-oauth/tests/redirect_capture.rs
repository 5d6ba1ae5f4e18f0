//! Redirect listener behaviour over real HTTP.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use warden_oauth::{CaptureSource, RedirectCaptureServer, redirect::Offer};

async fn get(port: u16, path: &str) -> (u16, String) {
    let response = reqwest::get(format!("http://127.0.0.1:{}{}", port, path))
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_listener_rejects_then_captures() {
    let server = RedirectCaptureServer::bind(0).await.unwrap();
    let port = server.port().unwrap();
    let (_tx, rx) = mpsc::unbounded_channel();
    let abort = CancellationToken::new();

    let waiter = tokio::spawn(async move { server.wait(rx, &abort).await });

    let (status, body) = get(port, "/favicon.ico").await;
    assert_eq!(status, 200);
    assert!(body.contains("does not represent an authorization redirect"));
    assert!(!waiter.is_finished());

    let (_, body) = get(port, "/?code=abc123&state=xyz").await;
    assert!(body.contains("Authorization redirect completed"));

    let captured = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(captured.source, CaptureSource::Listener);
    assert_eq!(captured.code().as_deref(), Some("abc123"));
    assert_eq!(captured.state().as_deref(), Some("xyz"));

    // the listener is gone once the wait returns
    assert!(reqwest::get(format!("http://127.0.0.1:{}/", port)).await.is_err());
}

#[tokio::test]
async fn test_manual_entry_wins_listener_sees_already_provided() {
    let server = RedirectCaptureServer::bind(0).await.unwrap();
    let port = server.port().unwrap();
    let slot = server.slot().clone();

    let manual = Url::parse("http://localhost/?code=pasted").unwrap();
    assert_eq!(slot.offer(manual, CaptureSource::Manual), Offer::Accepted);

    let (_, body) = get(port, "/?code=late").await;
    assert!(body.contains("already been provided"));

    let (_tx, rx) = mpsc::unbounded_channel();
    let captured = server.wait(rx, &CancellationToken::new()).await.unwrap();
    assert_eq!(captured.source, CaptureSource::Manual);
    assert_eq!(captured.code().as_deref(), Some("pasted"));
}

#[tokio::test]
async fn test_listener_wins_manual_line_is_ignored() {
    let server = RedirectCaptureServer::bind(0).await.unwrap();
    let port = server.port().unwrap();

    let (_, body) = get(port, "/?code=from-browser").await;
    assert!(body.contains("Authorization redirect completed"));

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send("http://localhost/?code=from-terminal\n".to_string())
        .unwrap();
    let captured = server.wait(rx, &CancellationToken::new()).await.unwrap();
    assert_eq!(captured.source, CaptureSource::Listener);
    assert_eq!(captured.code().as_deref(), Some("from-browser"));
}

#[tokio::test]
async fn test_head_request_never_captures() {
    let mut server = RedirectCaptureServer::bind(0).await.unwrap();
    let port = server.port().unwrap();

    let response = reqwest::Client::new()
        .head(format!("http://127.0.0.1:{}/?code=abc123", port))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(server.slot().get().is_none());

    server.stop().await.unwrap();
}
