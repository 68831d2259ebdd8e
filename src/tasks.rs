//! Orchestration around the pipeline: fetch, extract and store, per venue.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::VenueConfig;
use crate::infra::http_client::PageFetcher;
use crate::metrics::ExtractionMetrics;
use crate::pipeline::ExtractionPipeline;
use crate::storage::EventSink;

/// How one venue's run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VenueStatus {
    Extracted {
        events: usize,
        stored: usize,
        rejected: usize,
    },
    /// The page was fetched but yielded no events.
    Empty { rejected: usize },
    /// No document was available; the pipeline never ran.
    FetchFailed { error: String },
    /// Bad venue config or a sink failure.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueOutcome {
    pub venue_id: String,
    #[serde(flatten)]
    pub status: VenueStatus,
}

/// Fetches, extracts and stores one venue.
pub async fn run_venue(
    config: &VenueConfig,
    fetcher: &dyn PageFetcher,
    sink: &dyn EventSink,
    reference_now: NaiveDateTime,
) -> VenueOutcome {
    let venue_id = config.id().to_string();
    let outcome = |status| VenueOutcome {
        venue_id: venue_id.clone(),
        status,
    };

    let pipeline = match ExtractionPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Invalid config for {}: {}", venue_id, e);
            return outcome(VenueStatus::Failed {
                error: e.to_string(),
            });
        }
    };

    let page = match fetcher.fetch(&config.venue.url).await {
        Ok(page) => page,
        Err(e) => {
            error!("Fetch failed for {}: {}", venue_id, e);
            ExtractionMetrics::record_fetch_error(&venue_id);
            return outcome(VenueStatus::FetchFailed {
                error: e.to_string(),
            });
        }
    };

    let report = match pipeline.run(&page.body, &page.url, reference_now) {
        Ok(report) => report,
        Err(e) => {
            error!("Extraction failed for {}: {}", venue_id, e);
            return outcome(VenueStatus::Failed {
                error: e.to_string(),
            });
        }
    };

    let rejected = report.rejections.len();
    if report.events.is_empty() {
        warn!(
            containers = report.containers_examined,
            rejected, "No events extracted for {}", venue_id
        );
        return outcome(VenueStatus::Empty { rejected });
    }

    match sink.write_events(&venue_id, &report.events).await {
        Ok(stored) => {
            info!(
                events = report.events.len(),
                stored, rejected, "Finished {}", venue_id
            );
            outcome(VenueStatus::Extracted {
                events: report.events.len(),
                stored,
                rejected,
            })
        }
        Err(e) => {
            error!("Sink write failed for {}: {}", venue_id, e);
            outcome(VenueStatus::Failed {
                error: e.to_string(),
            })
        }
    }
}

/// Runs venues concurrently, at most `max_concurrency` at a time.
/// Outcomes come back in input order.
pub async fn run_venues(
    venues: Vec<VenueConfig>,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn EventSink>,
    max_concurrency: usize,
    reference_now: NaiveDateTime,
) -> Vec<VenueOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(venues.len());

    for config in venues {
        let semaphore = semaphore.clone();
        let fetcher = fetcher.clone();
        let sink = sink.clone();
        let span = info_span!("venue", id = %config.id());
        handles.push(tokio::spawn(
            async move {
                let _permit = semaphore.acquire_owned().await;
                run_venue(&config, fetcher.as_ref(), sink.as_ref(), reference_now).await
            }
            .instrument(span),
        ));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("Venue task panicked: {}", e),
        }
    }
    outcomes
}
