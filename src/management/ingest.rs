use crate::{
    management::{IngestReport, TrackIngestor},
    spotify::{auth::TokenBroker, playlist::PlaylistFetcher},
    types::{IngestRequest, Outcome, PlaylistWindow, TriggerResponse},
    warning,
};

/// What one ingestion run did, end to end.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    /// `complete`, `partial` or `failed` for the fetch half of the run.
    pub fetch_status: &'static str,
    pub failures: Vec<String>,
    pub report: IngestReport,
}

impl IngestSummary {
    fn failed(reason: String) -> Self {
        Self {
            fetch_status: "failed",
            failures: vec![reason],
            report: IngestReport::default(),
        }
    }

    /// Worst of the fetch and write statuses.
    pub fn status(&self) -> &'static str {
        match (self.fetch_status, self.report.status()) {
            ("failed", _) | (_, "failed") => "failed",
            ("complete", "complete") => "complete",
            _ => "partial",
        }
    }

    pub fn message(&self) -> String {
        format!("{} tracks saved", self.report.submitted)
    }

    pub fn to_response(&self) -> TriggerResponse {
        TriggerResponse::with_status(self.message(), self.status())
    }
}

/// Server credentials, then the playlist fetch, then the batch writes.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    broker: TokenBroker,
    fetcher: PlaylistFetcher,
    ingestor: TrackIngestor,
}

impl IngestionOrchestrator {
    pub fn new(broker: TokenBroker, fetcher: PlaylistFetcher, ingestor: TrackIngestor) -> Self {
        Self {
            broker,
            fetcher,
            ingestor,
        }
    }

    pub async fn run(&self, request: &IngestRequest) -> IngestSummary {
        let headers = match self.broker.auth_headers().await {
            Outcome::Complete(headers) | Outcome::Partial { value: headers, .. } => headers,
            Outcome::Failed(reason) => {
                warning!("ingestion of {} aborted: {}", request.playlist_id, reason);
                return IngestSummary::failed(reason);
            }
        };

        let window = PlaylistWindow::from_bounds(request.start, request.end);
        let outcome = self
            .fetcher
            .fetch(
                &request.playlist_id,
                &headers,
                window,
                request.channel.as_deref(),
            )
            .await;

        let fetch_status = outcome.status();
        let failures: Vec<String> = outcome.failures().into_iter().map(String::from).collect();
        let tracks = match outcome.into_value() {
            Some(tracks) => tracks,
            None => {
                return Self::summary_without_writes(fetch_status, failures);
            }
        };

        let report = self.ingestor.ingest(&tracks).await;
        IngestSummary {
            fetch_status,
            failures,
            report,
        }
    }

    fn summary_without_writes(fetch_status: &'static str, failures: Vec<String>) -> IngestSummary {
        IngestSummary {
            fetch_status,
            failures,
            report: IngestReport::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(fetch_status: &'static str, failed_batches: Vec<usize>) -> IngestSummary {
        IngestSummary {
            fetch_status,
            failures: Vec::new(),
            report: IngestReport {
                submitted: 3,
                written: 3,
                batches: 2,
                failed_batches,
            },
        }
    }

    #[test]
    fn status_is_worst_of_both_halves() {
        assert_eq!(summary("complete", vec![]).status(), "complete");
        assert_eq!(summary("partial", vec![]).status(), "partial");
        assert_eq!(summary("complete", vec![1]).status(), "partial");
        assert_eq!(summary("complete", vec![0, 1]).status(), "failed");
        assert_eq!(summary("failed", vec![]).status(), "failed");
    }

    #[test]
    fn message_counts_submitted_tracks() {
        let response = summary("complete", vec![]).to_response();
        assert_eq!(response.result, "3 tracks saved");
        assert_eq!(response.status.as_deref(), Some("complete"));
    }
}
