use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{
    api,
    config::Settings,
    management::{IngestionOrchestrator, TokenStore, TrackIngestor},
    spotify::{auth::TokenBroker, playlist::PlaylistFetcher},
    store::DocumentStore,
    types::PendingLogin,
};

/// Everything the trigger handlers share.
#[derive(Clone)]
pub struct AppState {
    pub broker: TokenBroker,
    pub tokens: TokenStore,
    pub ingestor: TrackIngestor,
    pub orchestrator: IngestionOrchestrator,
    pub login: Arc<Mutex<Option<PendingLogin>>>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, store: Arc<dyn DocumentStore>) -> Self {
        Self::with_client(settings, store, Client::new())
    }

    pub fn with_client(
        settings: Arc<Settings>,
        store: Arc<dyn DocumentStore>,
        client: Client,
    ) -> Self {
        let tokens = TokenStore::new(Arc::clone(&store));
        let broker = TokenBroker::with_client(Arc::clone(&settings), tokens.clone(), client.clone());
        let fetcher = PlaylistFetcher::with_client(&settings.api_url, client);
        let ingestor = TrackIngestor::new(store);
        let orchestrator =
            IngestionOrchestrator::new(broker.clone(), fetcher, ingestor.clone());

        Self {
            broker,
            tokens,
            ingestor,
            orchestrator,
            login: Arc::new(Mutex::new(None)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .route("/getPlaylistTracks", post(api::get_playlist_tracks))
        .route("/saveTracks", post(api::save_tracks))
        .route("/getSpotifyToken", post(api::get_spotify_token))
        .route("/saveToken", post(api::save_token))
        .with_state(state)
}

pub async fn start_api_server(address: &str, state: AppState) -> Result<(), String> {
    let addr = SocketAddr::from_str(address)
        .map_err(|e| format!("invalid server address {}: {}", address, e))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("cannot bind {}: {}", addr, e))?;
    axum::serve(listener, router(state))
        .await
        .map_err(|e| e.to_string())
}
