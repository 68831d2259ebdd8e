//! Extraction pipeline: discover -> build -> filter -> dedupe, one document at a time.

pub mod processing;

use chrono::NaiveDateTime;
use scraper::Html;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::VenueConfig;
use crate::domain::{DateGranularity, EventCandidate, Rejection, VenueRef};
use crate::error::{ExtractError, Result};
use crate::metrics::ExtractionMetrics;
use processing::candidate::{BuildPolicy, CandidateBuilder, FieldSpecs};
use processing::date_parser::DateTextParser;
use processing::dedupe::{DedupPolicy, Deduplicator};
use processing::discovery::ContainerDiscoverer;
use processing::field_extractor::{FieldExtractor, FieldKind, FieldSpec};
use processing::json_ld;
use processing::quality_gate::{FilterOutcome, QualityFilter, TitleRules};

/// Everything one extraction pass produced, including what it threw away.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub venue_id: String,
    pub events: Vec<EventCandidate>,
    pub rejections: Vec<Rejection>,
    pub containers_examined: usize,
    pub json_ld_candidates: usize,
    pub duplicates_removed: usize,
}

/// The full extraction pipeline for one venue.
///
/// Holds no per-document state, so one instance can process any number of
/// pages, from any number of threads.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    venue_id: String,
    venue: VenueRef,
    discoverer: ContainerDiscoverer,
    specs: FieldSpecs,
    parser: DateTextParser,
    filter: QualityFilter,
    deduplicator: Deduplicator,
    policy: BuildPolicy,
    use_json_ld: bool,
}

fn field_spec(kind: FieldKind, strategies: &[String]) -> Result<FieldSpec> {
    if strategies.is_empty() {
        Ok(FieldSpec::defaults_for(kind))
    } else {
        FieldSpec::new(kind, strategies)
    }
}

impl ExtractionPipeline {
    /// A pipeline with built-in heuristics; the dedup policy has no default.
    pub fn new(venue: VenueRef, dedup: DedupPolicy) -> Self {
        Self {
            venue_id: venue.name.clone(),
            venue,
            discoverer: ContainerDiscoverer::new(),
            specs: FieldSpecs::default(),
            parser: DateTextParser::default(),
            filter: QualityFilter::default(),
            deduplicator: Deduplicator::new(dedup, DateGranularity::Day),
            policy: BuildPolicy {
                infer_categories: true,
                ..BuildPolicy::default()
            },
            use_json_ld: true,
        }
    }

    /// Builds a pipeline from a venue's TOML config.
    ///
    /// Invalid selectors, junk patterns or `default_time`, and a missing
    /// dedup policy, are configuration errors.
    pub fn from_config(config: &VenueConfig) -> Result<Self> {
        let policy = &config.policy;
        let selectors = &config.selectors;

        let specs = FieldSpecs {
            title: field_spec(FieldKind::Title, &selectors.title)?
                .with_min_len(policy.min_title_len)
                .with_first_line_fallback(true),
            date: field_spec(FieldKind::DateText, &selectors.date)?,
            price: field_spec(FieldKind::PriceText, &selectors.price)?,
            image: field_spec(FieldKind::ImageUrl, &selectors.image)?,
            link: field_spec(FieldKind::LinkUrl, &selectors.link)?,
            description: field_spec(FieldKind::Description, &selectors.description)?,
            location: field_spec(FieldKind::Location, &selectors.location)?,
        };

        let rules = TitleRules::new(
            policy.min_title_len,
            policy.max_title_len,
            &policy.junk_patterns,
            policy.replace_default_junk,
        )?;

        Ok(Self {
            venue_id: config.id().to_string(),
            venue: config.venue_ref(),
            discoverer: ContainerDiscoverer::new().with_supplemental(&selectors.containers)?,
            specs,
            parser: DateTextParser::new(policy.default_time()?),
            filter: QualityFilter::new(rules, policy.result_cap),
            deduplicator: Deduplicator::new(policy.dedup_policy()?, policy.dedup_granularity),
            policy: BuildPolicy {
                missing_date: policy.missing_date,
                require_explicit_year: policy.require_explicit_year,
                drop_past_events: policy.drop_past_events,
                location_override: policy.location_override,
                infer_categories: policy.infer_categories,
                categories: config.venue.categories.clone(),
            },
            use_json_ld: policy.use_json_ld,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.venue_id = id.into();
        self
    }

    pub fn with_field_specs(mut self, specs: FieldSpecs) -> Self {
        self.specs = specs;
        self
    }

    pub fn with_discoverer(mut self, discoverer: ContainerDiscoverer) -> Self {
        self.discoverer = discoverer;
        self
    }

    pub fn with_date_parser(mut self, parser: DateTextParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_quality_filter(mut self, filter: QualityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_build_policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_granularity(mut self, granularity: DateGranularity) -> Self {
        self.deduplicator = Deduplicator::new(self.deduplicator.policy(), granularity);
        self
    }

    pub fn with_json_ld(mut self, enabled: bool) -> Self {
        self.use_json_ld = enabled;
        self
    }

    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    pub fn venue(&self) -> &VenueRef {
        &self.venue
    }

    /// Extracts events from one HTML document fetched from `page_url`.
    ///
    /// Per-item failures end up in `rejections`; only an unparsable
    /// `page_url` is an error.
    #[instrument(skip(self, html), fields(venue = %self.venue_id))]
    pub fn run(
        &self,
        html: &str,
        page_url: &str,
        reference_now: NaiveDateTime,
    ) -> Result<ExtractionReport> {
        let started = Instant::now();
        let base = Url::parse(page_url)
            .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", page_url, e)))?;

        let document = Html::parse_document(html);
        let builder = CandidateBuilder::new(
            FieldExtractor::new(base),
            &self.specs,
            &self.parser,
            self.filter.rules(),
            &self.policy,
        );

        let mut candidates = Vec::new();
        let mut rejections = Vec::new();

        let mut json_ld_candidates = 0;
        let mut json_ld_built = 0;
        if self.use_json_ld {
            for event in json_ld::extract_events(&document) {
                json_ld_candidates += 1;
                match builder.from_json_ld(event, &self.venue, reference_now) {
                    Ok(candidate) => {
                        json_ld_built += 1;
                        candidates.push(candidate);
                    }
                    Err(rejection) => rejections.push(rejection),
                }
            }
        }

        let containers = self.discoverer.discover(&document);
        let containers_examined = containers.len();
        let mut html_built = 0;
        for container in containers {
            match builder.build(container, &self.venue, reference_now) {
                Ok(candidate) => {
                    html_built += 1;
                    candidates.push(candidate);
                }
                Err(rejection) => {
                    debug!(
                        container = %rejection.container,
                        reason = rejection.reason.label(),
                        "Container rejected"
                    );
                    rejections.push(rejection);
                }
            }
        }

        let FilterOutcome {
            kept,
            rejections: filtered,
        } = self.filter.filter(candidates);
        rejections.extend(filtered);

        let kept_count = kept.len();
        let events = self.deduplicator.dedupe(kept);
        let duplicates_removed = kept_count - events.len();

        ExtractionMetrics::record_containers(&self.venue_id, containers_examined);
        ExtractionMetrics::record_candidates(&self.venue_id, html_built, json_ld_built);
        ExtractionMetrics::record_rejections(&self.venue_id, &rejections);
        ExtractionMetrics::record_result(
            &self.venue_id,
            events.len(),
            duplicates_removed,
            started.elapsed().as_secs_f64(),
        );

        info!(
            containers = containers_examined,
            json_ld = json_ld_candidates,
            rejected = rejections.len(),
            duplicates = duplicates_removed,
            "Extracted {} events",
            events.len()
        );

        Ok(ExtractionReport {
            venue_id: self.venue_id.clone(),
            events,
            rejections,
            containers_examined,
            json_ld_candidates,
            duplicates_removed,
        })
    }
}
