use axum::{body::Bytes, extract::State, response::Json};

use crate::{
    api::parse_body,
    server::AppState,
    types::{IngestRequest, SaveTracksRequest, TriggerResponse},
};

pub async fn get_playlist_tracks(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<TriggerResponse> {
    let request: IngestRequest = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };

    let summary = state.orchestrator.run(&request).await;
    Json(summary.to_response())
}

pub async fn save_tracks(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<TriggerResponse> {
    let request: SaveTracksRequest = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };

    let report = state.ingestor.ingest_values(&request.tracks).await;
    Json(TriggerResponse::with_status(
        format!("{} tracks saved", report.submitted),
        report.status(),
    ))
}
