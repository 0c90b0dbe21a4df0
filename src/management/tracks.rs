use std::sync::Arc;

use serde_json::Value;

use crate::{
    info,
    spotify::normalize,
    store::{self, DocumentStore, MAX_BATCH_WRITES, TRACKS, WriteBatch},
    success,
    types::Track,
    utils, warning,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Tracks handed to the ingestor, falsy entries included.
    pub submitted: usize,
    /// Documents in batches the store accepted.
    pub written: usize,
    /// Batches visited, including a trailing empty one.
    pub batches: usize,
    pub failed_batches: Vec<usize>,
}

impl IngestReport {
    pub fn status(&self) -> &'static str {
        if self.failed_batches.is_empty() {
            "complete"
        } else if self.failed_batches.len() == self.batches {
            "failed"
        } else {
            "partial"
        }
    }
}

/// Appends tracks to the `tracks` collection in capped batch writes.
///
/// Batches are committed one after the other. A rejected batch is logged and
/// recorded in the report; the remaining batches still run. Every document
/// gets a fresh generated id, so ingesting the same playlist twice yields
/// duplicates.
#[derive(Clone)]
pub struct TrackIngestor {
    store: Arc<dyn DocumentStore>,
    batch_size: usize,
}

impl TrackIngestor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            batch_size: MAX_BATCH_WRITES,
        }
    }

    /// Smaller batches, clamped to `1..=MAX_BATCH_WRITES`.
    pub fn with_batch_size(store: Arc<dyn DocumentStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.clamp(1, MAX_BATCH_WRITES),
        }
    }

    /// Writes `tracks` to the store.
    ///
    /// Tracks without a uri stand for falsy payloads: they count towards
    /// `submitted` and the batch layout but are never written.
    pub async fn ingest(&self, tracks: &[Track]) -> IngestReport {
        let batches = utils::batch_count(tracks.len(), self.batch_size);
        let mut report = IngestReport {
            submitted: tracks.len(),
            batches,
            ..IngestReport::default()
        };

        for index in 0..batches {
            let start = (index * self.batch_size).min(tracks.len());
            let end = ((index + 1) * self.batch_size).min(tracks.len());

            let mut batch = WriteBatch::new();
            for track in tracks[start..end].iter().filter(|t| !t.uri.is_empty()) {
                match store::to_document(track) {
                    Ok(doc) => {
                        batch.create(TRACKS, doc);
                    }
                    Err(e) => warning!("skipping track {}: {}", track.uri, e),
                }
            }

            let size = batch.len();
            match self.store.commit(batch).await {
                Ok(()) => {
                    report.written += size;
                    info!("batch {} saved ({} tracks)", index, size);
                }
                Err(e) => {
                    warning!("batch {} failed: {}", index, e);
                    report.failed_batches.push(index);
                }
            }
        }

        if report.failed_batches.is_empty() {
            success!("{} tracks saved", report.written);
        }
        report
    }

    /// Normalizes raw payloads, flattened or playlist items, then ingests them.
    pub async fn ingest_values(&self, payloads: &[Value]) -> IngestReport {
        let tracks: Vec<Track> = payloads
            .iter()
            .map(|payload| normalize::normalize(payload, None).unwrap_or_default())
            .collect();
        self.ingest(&tracks).await
    }
}
