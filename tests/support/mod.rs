// Shared fixtures: a fake Spotify API served by axum on an ephemeral port.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use jukebox::config::Settings;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Mutex};

pub const ADDED_AT: &str = "2024-03-10T08:15:00Z";

#[derive(Default)]
pub struct FakeSpotify {
    pub total: usize,
    /// Page offsets that always answer 500.
    pub broken_offsets: HashSet<usize>,
    /// Number of page requests answered 500 before the fake behaves.
    pub flaky_pages: AtomicUsize,
    /// Refresh tokens the accounts service rejects.
    pub revoked: HashSet<String>,
    pub page_requests: Mutex<Vec<usize>>,
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,
    pub token_auth_headers: Mutex<Vec<String>>,
    pub player_requests: Mutex<Vec<(String, Option<String>, Option<Value>)>>,
    pub issued: AtomicUsize,
}

impl FakeSpotify {
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub async fn requested_offsets(&self) -> Vec<usize> {
        let mut offsets = self.page_requests.lock().await.clone();
        offsets.sort();
        offsets
    }
}

pub fn playlist_item(position: usize) -> Value {
    json!({
        "added_at": ADDED_AT,
        "track": {
            "name": format!("Track {}", position),
            "uri": format!("spotify:track:{}", position),
            "id": format!("{}", position),
            "duration_ms": 180000,
            "artists": [{ "name": "Artist" }],
            "album": { "name": "Album", "images": [{ "url": "https://img/1" }] }
        }
    })
}

async fn playlist(State(fake): State<Arc<FakeSpotify>>, Path(_id): Path<String>) -> Json<Value> {
    Json(json!({ "tracks": { "total": fake.total } }))
}

async fn playlist_tracks(
    State(fake): State<Arc<FakeSpotify>>,
    Path(_id): Path<String>,
    Query(params): Query<HashMap<String, usize>>,
) -> Response {
    let offset = params.get("offset").copied().unwrap_or(0);
    let limit = params.get("limit").copied().unwrap_or(100);
    fake.page_requests.lock().await.push(offset);

    if fake.broken_offsets.contains(&offset) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let flaky = fake.flaky_pages.load(Ordering::SeqCst);
    if flaky > 0 {
        fake.flaky_pages.store(flaky - 1, Ordering::SeqCst);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let end = (offset + limit).min(fake.total);
    let items: Vec<Value> = (offset..end).map(playlist_item).collect();
    Json(json!({ "items": items, "offset": offset, "total": fake.total })).into_response()
}

async fn token(
    State(fake): State<Arc<FakeSpotify>>,
    headers: axum::http::HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fake.token_auth_headers.lock().await.push(auth);
    fake.token_requests.lock().await.push(form.clone());

    let n = fake.issued.fetch_add(1, Ordering::SeqCst);
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => Json(json!({
            "access_token": format!("access-{}", n),
            "token_type": "Bearer",
            "scope": "streaming",
            "expires_in": 3600,
            "refresh_token": "refresh-from-code"
        }))
        .into_response(),
        Some("refresh_token") => {
            let refresh = form.get("refresh_token").cloned().unwrap_or_default();
            if fake.revoked.contains(&refresh) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_grant" })),
                )
                    .into_response();
            }
            Json(json!({
                "access_token": format!("access-{}", n),
                "token_type": "Bearer",
                "scope": "streaming",
                "expires_in": 3600
            }))
            .into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn player(
    State(fake): State<Arc<FakeSpotify>>,
    Path(action): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: axum::body::Bytes,
) -> StatusCode {
    let body = serde_json::from_slice::<Value>(&body).ok();
    fake.player_requests
        .lock()
        .await
        .push((action, params.get("device_id").cloned(), body));
    StatusCode::NO_CONTENT
}

/// Serves `fake` and returns its base url.
pub async fn spawn(fake: Arc<FakeSpotify>) -> String {
    let app = Router::new()
        .route("/playlists/{id}", get(playlist))
        .route("/playlists/{id}/tracks", get(playlist_tracks))
        .route("/api/token", post(token))
        .route("/me/player/{action}", put(player))
        .with_state(fake);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn settings(base_url: &str) -> Settings {
    let token_url = format!("{}/api/token", base_url);
    let pairs: HashMap<&str, String> = HashMap::from([
        ("SPOTIFY_CLIENT_ID", "client".to_string()),
        ("SPOTIFY_CLIENT_SECRET", "secret".to_string()),
        ("SPOTIFY_REFRESH_TOKEN", "server-refresh".to_string()),
        ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8080/callback".to_string()),
        ("SPOTIFY_API_URL", base_url.to_string()),
        ("SPOTIFY_API_TOKEN_URL", token_url),
        ("JUKEBOX_DATA_DIR", std::env::temp_dir().display().to_string()),
    ]);
    Settings::from_lookup(|key| pairs.get(key).cloned()).unwrap()
}
