use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::domain::EventCandidate;
use crate::error::Result;

/// One persisted event, tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub venue_id: String,
    pub run_id: Uuid,
    pub extracted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EventCandidate,
}

/// Consumer of extracted events. Uniqueness across runs is the sink's job.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Stores a venue's events and returns how many were new.
    async fn write_events(&self, venue_id: &str, events: &[EventCandidate]) -> Result<usize>;
}

fn stored(venue_id: &str, run_id: Uuid, event: &EventCandidate) -> StoredEvent {
    StoredEvent {
        event_id: event.event_id(),
        venue_id: venue_id.to_string(),
        run_id,
        extracted_at: Utc::now(),
        event: event.clone(),
    }
}

/// In-memory sink keyed by event id, for development and tests.
#[derive(Clone)]
pub struct InMemorySink {
    run_id: Uuid,
    events: Arc<Mutex<HashMap<Uuid, StoredEvent>>>,
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            events: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored events, ordered by venue then title.
    pub fn snapshot(&self) -> Vec<StoredEvent> {
        let mut events: Vec<StoredEvent> = match self.events.lock() {
            Ok(events) => events.values().cloned().collect(),
            Err(_) => Vec::new(),
        };
        events.sort_by(|a, b| {
            (&a.venue_id, &a.event.title).cmp(&(&b.venue_id, &b.event.title))
        });
        events
    }
}

#[async_trait]
impl EventSink for InMemorySink {
    async fn write_events(&self, venue_id: &str, events: &[EventCandidate]) -> Result<usize> {
        let mut store = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut inserted = 0;
        for event in events {
            let record = stored(venue_id, self.run_id, event);
            if store.insert(record.event_id, record).is_none() {
                inserted += 1;
            }
        }
        debug!("Stored {} new events for {}", inserted, venue_id);
        Ok(inserted)
    }
}

/// Appends events as JSON lines; skips ids already written by this sink.
pub struct JsonLinesSink {
    path: PathBuf,
    run_id: Uuid,
    written: tokio::sync::Mutex<std::collections::HashSet<Uuid>>,
}

impl JsonLinesSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            run_id: Uuid::new_v4(),
            written: tokio::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn write_events(&self, venue_id: &str, events: &[EventCandidate]) -> Result<usize> {
        // Held across the write so lines from concurrent venues never interleave.
        let mut written = self.written.lock().await;

        let mut buffer = String::new();
        let mut pending = Vec::new();
        for event in events {
            let record = stored(venue_id, self.run_id, event);
            if written.contains(&record.event_id) || pending.contains(&record.event_id) {
                continue;
            }
            buffer.push_str(&serde_json::to_string(&record)?);
            buffer.push('\n');
            pending.push(record.event_id);
        }
        if pending.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;

        // Only ids that reached the file count as written, so a failed append is retried.
        let inserted = pending.len();
        written.extend(pending);

        debug!("Appended {} events for {} to {}", inserted, venue_id, self.path.display());
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateSource, DateGranularity, ParsedDateRange, VenueRef};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn event(title: &str) -> EventCandidate {
        showtime(title, 20)
    }

    fn showtime(title: &str, hour: u32) -> EventCandidate {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        EventCandidate {
            title: title.to_string(),
            date_range: Some(ParsedDateRange::single(start)),
            venue: VenueRef::new("The Rex", "194 Queen St W", "Toronto"),
            price_text: Some("$20".to_string()),
            image_url: None,
            url: "https://therex.ca/events/1".to_string(),
            description: format!("{} at The Rex", title),
            categories: vec!["Music".to_string()],
            location_text: None,
            date_text: Some("March 1".to_string()),
            source: CandidateSource::Html,
            description_extracted: false,
            quality_score: 4.0,
            key_granularity: DateGranularity::Day,
        }
    }

    #[tokio::test]
    async fn test_in_memory_sink_upserts_by_event_id() {
        let sink = InMemorySink::new();
        let batch = vec![event("Jazz Night"), event("Blues Brunch")];

        assert_eq!(sink.write_events("rex", &batch).await.unwrap(), 2);
        assert_eq!(sink.write_events("rex", &batch).await.unwrap(), 0);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.snapshot()[0].event.title, "Blues Brunch");
    }

    #[tokio::test]
    async fn test_json_lines_sink_appends_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("events.jsonl");
        let sink = JsonLinesSink::new(&path);

        assert_eq!(
            sink.write_events("rex", &[event("Jazz Night")]).await.unwrap(),
            1
        );
        assert_eq!(
            sink.write_events("rex", &[event("Jazz Night"), event("Blues Brunch")])
                .await
                .unwrap(),
            1
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<StoredEvent> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].venue_id, "rex");
        assert_eq!(records[0].event.title, "Jazz Night");
        assert_eq!(records[0].event_id, event("Jazz Night").event_id());
        assert!(content.contains("\"start\":\"2026-03-01T20:00:00\""));
    }

    #[tokio::test]
    async fn test_same_day_showtimes_are_stored_separately() {
        let mut matinee = showtime("Jazz Matinee Set", 15);
        let mut evening = showtime("Jazz Matinee Set", 21);
        matinee.key_granularity = DateGranularity::Timestamp;
        evening.key_granularity = DateGranularity::Timestamp;

        let sink = InMemorySink::new();
        assert_eq!(
            sink.write_events("rex", &[matinee.clone(), evening.clone()])
                .await
                .unwrap(),
            2
        );
        assert_eq!(sink.len(), 2);

        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("events.jsonl"));
        assert_eq!(
            sink.write_events("rex", &[matinee, evening]).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_json_lines_sink_retries_after_failed_append() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the append fail.
        let path = dir.path().join("events.jsonl");
        std::fs::create_dir(&path).unwrap();
        let sink = JsonLinesSink::new(&path);

        assert!(sink.write_events("rex", &[event("Jazz Night")]).await.is_err());

        std::fs::remove_dir(&path).unwrap();
        assert_eq!(
            sink.write_events("rex", &[event("Jazz Night")]).await.unwrap(),
            1
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_json_lines_sink_skips_repeats_within_one_batch() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("events.jsonl"));
        assert_eq!(
            sink.write_events("rex", &[event("Jazz Night"), event("Jazz Night")])
                .await
                .unwrap(),
            1
        );
    }
}
