//! Upload retry behavior against a flaky storage gateway

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use shutter_mint::providers::{AssetStore, HttpAssetStore, ProviderError};

#[derive(Clone)]
struct GatewayState {
    hits: Arc<AtomicU32>,
    /// Requests that fail before the gateway starts succeeding
    failures: u32,
}

async fn upload_stub(
    State(state): State<GatewayState>,
    body: axum::body::Bytes,
) -> Json<serde_json::Value> {
    let attempt = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= state.failures {
        Json(serde_json::json!({"success": false, "error": "pin backlog"}))
    } else {
        Json(serde_json::json!({"success": true, "cid": format!("Qm{}", body.len())}))
    }
}

/// Gateway stub that rejects the first `failures` uploads
async fn spawn_gateway(failures: u32) -> (String, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let app = Router::new().route("/upload", post(upload_stub)).with_state(GatewayState {
        hits: hits.clone(),
        failures,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

#[tokio::test]
async fn upload_retries_through_transient_failures() {
    let (base, hits) = spawn_gateway(2).await;
    let store = HttpAssetStore::new(&base);

    // First two attempts fail, the third lands (after 2s + 4s backoff)
    let cid = store.upload("shot.jpg", b"image bytes").await.unwrap();
    assert_eq!(cid, "Qm11");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn upload_gives_up_after_three_attempts() {
    let (base, hits) = spawn_gateway(u32::MAX).await;
    let store = HttpAssetStore::new(&base);

    let err = store.upload("shot.jpg", b"image bytes").await.unwrap_err();
    match err {
        ProviderError::Service(msg) => assert_eq!(msg, "pin backlog"),
        other => panic!("expected service error, got {}", other),
    }
    // Exactly three attempts, never a fourth
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
