use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    cli::open_store,
    config::Settings,
    error,
    management::{IngestionOrchestrator, TokenStore, TrackIngestor},
    spotify::{auth::TokenBroker, playlist::PlaylistFetcher},
    success,
    types::IngestRequest,
    warning,
};

/// Fetches a playlist and appends its tracks to the store, the same run the
/// `/getPlaylistTracks` trigger performs.
pub async fn ingest(
    settings: Settings,
    playlist_id: String,
    start: Option<usize>,
    end: Option<usize>,
    channel: Option<String>,
) {
    let store = open_store(&settings);
    let settings = Arc::new(settings);
    let broker = TokenBroker::new(Arc::clone(&settings), TokenStore::new(Arc::clone(&store)));
    let orchestrator = IngestionOrchestrator::new(
        broker,
        PlaylistFetcher::new(&settings),
        TrackIngestor::new(store),
    );

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Ingesting playlist {}...", playlist_id));
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }

    let summary = orchestrator
        .run(&IngestRequest {
            playlist_id,
            start,
            end,
            channel,
        })
        .await;
    pb.finish_and_clear();

    for failure in &summary.failures {
        warning!("{}", failure);
    }
    match summary.status() {
        "complete" => success!("{}", summary.message()),
        "partial" => warning!(
            "{} ({} of {} batches failed)",
            summary.message(),
            summary.report.failed_batches.len(),
            summary.report.batches
        ),
        _ => error!("Ingestion failed. {}", summary.message()),
    }
}
