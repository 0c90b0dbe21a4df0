mod support;

use std::sync::Arc;

use jukebox::{
    management::TokenStore,
    server::{AppState, router},
    store::{DocumentStore, MemoryStore, TRACKS, USERS},
    types::{PendingLogin, TokenResponse, TriggerResponse},
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use support::FakeSpotify;
use tokio::net::TcpListener;

struct Harness {
    url: String,
    store: Arc<MemoryStore>,
    state: AppState,
    client: Client,
}

async fn harness(fake: FakeSpotify) -> Harness {
    let base = support::spawn(Arc::new(fake)).await;
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_client(
        Arc::new(support::settings(&base)),
        store.clone(),
        Client::new(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        url: format!("http://{}", addr),
        store,
        state,
        client: Client::new(),
    }
}

impl Harness {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.url, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health() {
    let h = harness(FakeSpotify::default()).await;

    let body: Value = h
        .client
        .get(format!("{}/health", h.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_get_playlist_tracks_reports_count() {
    let h = harness(FakeSpotify::with_total(120)).await;

    let response = h
        .post(
            "/getPlaylistTracks",
            json!({ "playlistId": "p1", "channelTag": "radio" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: TriggerResponse = response.json().await.unwrap();
    assert_eq!(body.result, "120 tracks saved");
    assert_eq!(body.status.as_deref(), Some("complete"));
    assert_eq!(h.store.len(TRACKS).await, 120);
}

#[tokio::test]
async fn test_get_playlist_tracks_with_window() {
    let h = harness(FakeSpotify::with_total(500)).await;

    let body: TriggerResponse = h
        .post(
            "/getPlaylistTracks",
            json!({ "playlistId": "p1", "start": 10, "end": 60 }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.result, "50 tracks saved");
}

#[tokio::test]
async fn test_save_tracks_drops_falsy_entries() {
    let h = harness(FakeSpotify::default()).await;

    let body: TriggerResponse = h
        .post(
            "/saveTracks",
            json!({ "tracks": [
                { "uri": "spotify:track:1", "name": "One" },
                null,
                { "uri": "spotify:track:2", "name": "Two" }
            ] }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body.result, "3 tracks saved");
    assert_eq!(h.store.len(TRACKS).await, 2);
}

#[tokio::test]
async fn test_save_token_with_empty_token() {
    let h = harness(FakeSpotify::default()).await;

    let body: TriggerResponse = h
        .post(
            "/saveToken",
            json!({ "token": "", "tokenType": "access", "userId": "u1" }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body.result, "Empty token.");
    assert!(h.store.get(USERS, "u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_token_with_falsy_token_and_partial_body() {
    let h = harness(FakeSpotify::default()).await;

    // No tokenType, and a token that is not a string
    for payload in [
        json!({ "token": false, "userId": "u1" }),
        json!({ "userId": "u1" }),
        json!({ "token": null, "tokenType": "access" }),
    ] {
        let body: TriggerResponse = h.post("/saveToken", payload).await.json().await.unwrap();
        assert_eq!(body.result, "Empty token.");
        assert_eq!(body.status.as_deref(), Some("complete"));
    }
    assert!(h.store.get(USERS, "u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_token_merges_into_user() {
    let h = harness(FakeSpotify::default()).await;

    let body: TriggerResponse = h
        .post(
            "/saveToken",
            json!({
                "token": "a1",
                "tokenType": "access",
                "refreshToken": "r1",
                "userId": "u1"
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.result, "Access token successfully added.");
    assert!(!body.result.contains("a1"));

    let record = TokenStore::new(h.store.clone())
        .load("u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access, "a1");
    assert_eq!(record.refresh.as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_get_spotify_token_exchanges_and_stores() {
    let h = harness(FakeSpotify::default()).await;

    let body: TokenResponse = h
        .post(
            "/getSpotifyToken",
            json!({ "tokenType": "access", "code": "c", "userId": "u1" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.token, "access-0");
    assert_eq!(body.refresh_token, "refresh-from-code");

    let user = h.store.get(USERS, "u1").await.unwrap().unwrap();
    assert_eq!(user["tokens"]["refresh"], "refresh-from-code");
}

#[tokio::test]
async fn test_malformed_body_is_still_ok() {
    let h = harness(FakeSpotify::default()).await;

    let response = h
        .client
        .post(format!("{}/saveToken", h.url))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: TriggerResponse = response.json().await.unwrap();
    assert_eq!(body.status.as_deref(), Some("failed"));
}

#[tokio::test]
async fn test_callback_completes_pending_login() {
    let h = harness(FakeSpotify::default()).await;
    *h.state.login.lock().await = Some(PendingLogin {
        state: "s1".to_string(),
        user_id: "device-user".to_string(),
        token: None,
    });

    // Wrong state is refused
    let refused = h
        .client
        .get(format!("{}/callback?code=c&state=other", h.url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(refused.contains("mismatch"));
    assert!(h.state.login.lock().await.as_ref().unwrap().token.is_none());

    let page = h
        .client
        .get(format!("{}/callback?code=c&state=s1", h.url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("successful"));

    let pending = h.state.login.lock().await.clone().unwrap();
    assert_eq!(pending.token.unwrap().token, "access-0");
    assert!(h.store.get(USERS, "device-user").await.unwrap().is_some());
}
