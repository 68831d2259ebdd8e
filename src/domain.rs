//! Domain data shapes shared by the pipeline stages, the sink and the CLI.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Static venue metadata supplied by venue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRef {
    pub name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Option<Coordinates>,
}

impl VenueRef {
    pub fn new(name: impl Into<String>, address: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            city: city.into(),
            coordinates: None,
        }
    }
}

/// A start timestamp with an optional end. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDateRange {
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
}

impl ParsedDateRange {
    /// Builds a range, discarding an end that precedes the start.
    pub fn new(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Self {
        let end = end.filter(|end| *end >= start);
        Self { start, end }
    }

    pub fn single(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// The latest instant covered by the range.
    pub fn last_moment(&self) -> NaiveDateTime {
        self.end.unwrap_or(self.start)
    }

    pub fn iso_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn iso_timestamp(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Where a candidate's fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Html,
    JsonLd,
}

/// How much of the start timestamp participates in the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    /// Date portion only.
    #[default]
    Day,
    /// Full timestamp, for venues listing several showtimes per day.
    Timestamp,
}

/// Identity of an event inside one extraction batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub title: String,
    pub date: String,
    pub venue: String,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.title, self.date, self.venue)
    }
}

/// Lower-cases, trims and collapses internal whitespace.
pub fn normalize_key_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An extracted, not-yet-validated event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    pub title: String,
    pub date_range: Option<ParsedDateRange>,
    pub venue: VenueRef,
    pub price_text: Option<String>,
    pub image_url: Option<String>,
    pub url: String,
    pub description: String,
    pub categories: Vec<String>,
    /// Free-text location found in the container, if any.
    pub location_text: Option<String>,
    /// The raw date text the range was parsed from.
    pub date_text: Option<String>,
    pub source: CandidateSource,
    /// False when `description` is the generated "<title> at <venue>" default.
    #[serde(skip)]
    pub description_extracted: bool,
    pub quality_score: f64,
    /// Granularity of the dedup key this candidate survived; set by the deduplicator.
    #[serde(skip)]
    pub key_granularity: DateGranularity,
}

impl EventCandidate {
    pub fn dedup_key(&self, granularity: DateGranularity) -> DedupKey {
        let date = match (&self.date_range, granularity) {
            (Some(range), DateGranularity::Day) => range.iso_date(),
            (Some(range), DateGranularity::Timestamp) => range.iso_timestamp(),
            (None, _) => String::new(),
        };
        DedupKey {
            title: normalize_key_text(&self.title),
            date,
            venue: normalize_key_text(&self.venue.name),
        }
    }

    /// Stable id derived from the dedup key, for sink upserts. Two showtimes
    /// on one day get distinct ids when the key is timestamp-granular.
    pub fn event_id(&self) -> Uuid {
        let key = self.dedup_key(self.key_granularity).to_string();
        Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
    }
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    MissingTitle,
    TitleTooShort { len: usize, min: usize },
    TitleTooLong { len: usize, max: usize },
    BlockedTitle { pattern: String },
    DateOnlyTitle,
    MissingDate,
    MissingYear,
    PastEvent,
    BelowCap,
}

impl RejectionReason {
    /// Short stable label, used for log fields and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::MissingTitle => "missing_title",
            RejectionReason::TitleTooShort { .. } => "title_too_short",
            RejectionReason::TitleTooLong { .. } => "title_too_long",
            RejectionReason::BlockedTitle { .. } => "blocked_title",
            RejectionReason::DateOnlyTitle => "date_only_title",
            RejectionReason::MissingDate => "missing_date",
            RejectionReason::MissingYear => "missing_year",
            RejectionReason::PastEvent => "past_event",
            RejectionReason::BelowCap => "below_cap",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TitleTooShort { len, min } => {
                write!(f, "title too short ({} < {})", len, min)
            }
            RejectionReason::TitleTooLong { len, max } => {
                write!(f, "title too long ({} > {})", len, max)
            }
            RejectionReason::BlockedTitle { pattern } => {
                write!(f, "title matches blocklist pattern '{}'", pattern)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// A rejected candidate, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    /// Short descriptor of the originating container, e.g. `div.event-card`.
    pub container: String,
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_range_drops_end_before_start() {
        let range = ParsedDateRange::new(at(2026, 3, 2, 0), Some(at(2026, 3, 1, 0)));
        assert_eq!(range.end(), None);

        let range = ParsedDateRange::new(at(2026, 3, 1, 0), Some(at(2026, 3, 5, 0)));
        assert_eq!(range.end(), Some(at(2026, 3, 5, 0)));
        assert_eq!(range.last_moment(), at(2026, 3, 5, 0));
    }

    #[test]
    fn test_dedup_key_normalizes_title_and_venue() {
        let candidate = EventCandidate {
            title: "  Jazz   NIGHT ".to_string(),
            date_range: Some(ParsedDateRange::single(at(2026, 3, 1, 19))),
            venue: VenueRef::new("The Rex", "194 Queen St W", "Toronto"),
            price_text: None,
            image_url: None,
            url: "https://example.com".to_string(),
            description: String::new(),
            categories: vec![],
            location_text: None,
            date_text: None,
            source: CandidateSource::Html,
            description_extracted: false,
            quality_score: 0.0,
            key_granularity: DateGranularity::Day,
        };

        let key = candidate.dedup_key(DateGranularity::Day);
        assert_eq!(key.title, "jazz night");
        assert_eq!(key.date, "2026-03-01");
        assert_eq!(key.venue, "the rex");

        let key = candidate.dedup_key(DateGranularity::Timestamp);
        assert_eq!(key.date, "2026-03-01T19:00:00");

        assert_eq!(candidate.event_id(), candidate.clone().event_id());

        let mut later = candidate.clone();
        later.date_range = Some(ParsedDateRange::single(at(2026, 3, 1, 22)));
        assert_eq!(candidate.event_id(), later.event_id());

        let mut early = candidate;
        early.key_granularity = DateGranularity::Timestamp;
        later.key_granularity = DateGranularity::Timestamp;
        assert_ne!(early.event_id(), later.event_id());
    }
}
