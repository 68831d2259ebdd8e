//! Turns a discovered container (or a JSON-LD event) into an [`EventCandidate`].

use chrono::NaiveDateTime;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_PRICE_TEXT;
use crate::domain::{
    CandidateSource, DateGranularity, EventCandidate, ParsedDateRange, Rejection,
    RejectionReason, VenueRef,
};
use crate::pipeline::processing::date_parser::{has_explicit_year, DateTextParser};
use crate::pipeline::processing::discovery::describe;
use crate::pipeline::processing::field_extractor::{
    element_text, normalize_url, FieldExtractor, FieldKind, FieldSpec,
};
use crate::pipeline::processing::json_ld::JsonLdEvent;
use crate::pipeline::processing::normalize::{
    infer_categories, merge_categories, normalize_price, truncate_chars,
};
use crate::pipeline::processing::quality_gate::TitleRules;

const MAX_DESCRIPTION_LEN: usize = 1000;
const LOCATION_OVERRIDE_LEN: std::ops::RangeInclusive<usize> = 3..=100;

pub type BuildOutcome = std::result::Result<EventCandidate, Rejection>;

/// What to do with a candidate whose date could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDatePolicy {
    /// Drop the candidate.
    #[default]
    Reject,
    /// Stamp the candidate with the reference time.
    DefaultToNow,
    /// Keep the candidate without a date.
    Allow,
}

/// One [`FieldSpec`] per logical field.
#[derive(Debug, Clone)]
pub struct FieldSpecs {
    pub title: FieldSpec,
    pub date: FieldSpec,
    pub price: FieldSpec,
    pub image: FieldSpec,
    pub link: FieldSpec,
    pub description: FieldSpec,
    pub location: FieldSpec,
}

impl Default for FieldSpecs {
    fn default() -> Self {
        Self {
            title: FieldSpec::defaults_for(FieldKind::Title),
            date: FieldSpec::defaults_for(FieldKind::DateText),
            price: FieldSpec::defaults_for(FieldKind::PriceText),
            image: FieldSpec::defaults_for(FieldKind::ImageUrl),
            link: FieldSpec::defaults_for(FieldKind::LinkUrl),
            description: FieldSpec::defaults_for(FieldKind::Description),
            location: FieldSpec::defaults_for(FieldKind::Location),
        }
    }
}

/// Per-venue build-time policy.
#[derive(Debug, Clone, Default)]
pub struct BuildPolicy {
    pub missing_date: MissingDatePolicy,
    /// Reject dates whose text carries no four-digit year.
    pub require_explicit_year: bool,
    /// Reject events that ended before the reference time's day.
    pub drop_past_events: bool,
    /// Replace the venue name with the container's location text.
    pub location_override: bool,
    pub infer_categories: bool,
    /// Static tags applied to every event of the venue.
    pub categories: Vec<String>,
}

/// Builds candidates for one page; borrows the venue's specs and rules.
#[derive(Debug, Clone)]
pub struct CandidateBuilder<'a> {
    extractor: FieldExtractor,
    specs: &'a FieldSpecs,
    parser: &'a DateTextParser,
    rules: &'a TitleRules,
    policy: &'a BuildPolicy,
}

struct Fields {
    title: String,
    date_text: Option<String>,
    date_range: Option<ParsedDateRange>,
    price: Option<String>,
    image: Option<String>,
    url: Option<String>,
    description: Option<String>,
    location: Option<String>,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(
        extractor: FieldExtractor,
        specs: &'a FieldSpecs,
        parser: &'a DateTextParser,
        rules: &'a TitleRules,
        policy: &'a BuildPolicy,
    ) -> Self {
        Self {
            extractor,
            specs,
            parser,
            rules,
            policy,
        }
    }

    /// Builds a candidate from an HTML container.
    ///
    /// The title is checked before any other field is read.
    pub fn build(
        &self,
        container: ElementRef<'_>,
        venue: &VenueRef,
        reference_now: NaiveDateTime,
    ) -> BuildOutcome {
        let label = describe(container);
        let reject = |reason: RejectionReason, title: Option<String>| Rejection {
            reason,
            container: label.clone(),
            title,
        };

        let Some(title) = self.extractor.extract(container, &self.specs.title) else {
            return Err(reject(RejectionReason::MissingTitle, None));
        };
        if let Err(reason) = self.rules.check(&title) {
            return Err(reject(reason, Some(title)));
        }

        let mut date_text = self.extractor.extract(container, &self.specs.date);
        let mut date_range = date_text
            .as_deref()
            .and_then(|text| self.parser.parse(text, reference_now));

        if date_range.is_none() {
            // Dates embedded in prose rather than a dedicated element.
            let text = element_text(container);
            if let Some(found) = self.parser.locate(&text, reference_now) {
                date_range = self.parser.parse(&found, reference_now);
                date_text = Some(found);
            }
        }

        let fields = Fields {
            title,
            date_text,
            date_range,
            price: self.extractor.extract(container, &self.specs.price),
            image: self.extractor.extract(container, &self.specs.image),
            url: self.extractor.extract(container, &self.specs.link),
            description: self.extractor.extract(container, &self.specs.description),
            location: self.extractor.extract(container, &self.specs.location),
        };

        self.finish(fields, venue, reference_now, CandidateSource::Html)
            .map_err(|(reason, title)| reject(reason, Some(title)))
    }

    /// Applies the same checks, defaults and policy to a JSON-LD event.
    pub fn from_json_ld(
        &self,
        event: JsonLdEvent,
        venue: &VenueRef,
        reference_now: NaiveDateTime,
    ) -> BuildOutcome {
        let reject = |reason: RejectionReason, title: Option<String>| Rejection {
            reason,
            container: "script[ld+json]".to_string(),
            title,
        };

        let Some(title) = event.name else {
            return Err(reject(RejectionReason::MissingTitle, None));
        };
        if let Err(reason) = self.rules.check(&title) {
            return Err(reject(reason, Some(title)));
        }

        let start = event
            .start_date
            .as_deref()
            .and_then(|text| self.parser.parse(text, reference_now));
        let end = event
            .end_date
            .as_deref()
            .and_then(|text| self.parser.parse(text, reference_now));
        let date_range = start.map(|start| {
            let end = end.map(|end| end.last_moment()).or(start.end());
            ParsedDateRange::new(start.start(), end)
        });

        let base = self.extractor.base_url();
        let fields = Fields {
            title,
            date_text: event.start_date,
            date_range,
            price: event.price,
            image: normalize_url(event.image.as_deref(), base),
            url: normalize_url(event.url.as_deref(), base),
            description: event.description,
            location: event.location,
        };

        self.finish(fields, venue, reference_now, CandidateSource::JsonLd)
            .map_err(|(reason, title)| reject(reason, Some(title)))
    }

    fn finish(
        &self,
        fields: Fields,
        venue: &VenueRef,
        reference_now: NaiveDateTime,
        source: CandidateSource,
    ) -> std::result::Result<EventCandidate, (RejectionReason, String)> {
        let Fields {
            title,
            date_text,
            mut date_range,
            price,
            image,
            url,
            description,
            location,
        } = fields;

        if date_range.is_none() {
            match self.policy.missing_date {
                MissingDatePolicy::Reject => {
                    debug!(title = %title, "No parsable date");
                    return Err((RejectionReason::MissingDate, title));
                }
                MissingDatePolicy::DefaultToNow => {
                    date_range = Some(ParsedDateRange::single(reference_now));
                }
                MissingDatePolicy::Allow => {}
            }
        }

        if self.policy.require_explicit_year {
            let explicit = date_text.as_deref().map_or(false, has_explicit_year);
            if date_range.is_some() && !explicit {
                return Err((RejectionReason::MissingYear, title));
            }
        }

        if self.policy.drop_past_events {
            if let Some(range) = &date_range {
                if range.last_moment().date() < reference_now.date() {
                    return Err((RejectionReason::PastEvent, title));
                }
            }
        }

        let mut venue = venue.clone();
        if self.policy.location_override {
            if let Some(location) = &location {
                if LOCATION_OVERRIDE_LEN.contains(&location.chars().count()) {
                    venue.name = location.clone();
                }
            }
        }

        let description_extracted = description.is_some();
        let description = match description {
            Some(text) => truncate_chars(&text, MAX_DESCRIPTION_LEN),
            None => format!("{} at {}", title, venue.name),
        };

        let categories = if self.policy.infer_categories {
            let inferred = infer_categories(&format!("{} {}", title, description));
            merge_categories(&self.policy.categories, inferred)
        } else {
            self.policy.categories.clone()
        };

        Ok(EventCandidate {
            price_text: Some(
                price
                    .and_then(|p| normalize_price(&p))
                    .unwrap_or_else(|| DEFAULT_PRICE_TEXT.to_string()),
            ),
            image_url: image,
            url: url.unwrap_or_else(|| self.extractor.base_url().to_string()),
            description,
            categories,
            location_text: location,
            date_text,
            date_range,
            venue,
            title,
            source,
            description_extracted,
            quality_score: 0.0,
            key_granularity: DateGranularity::Day,
        })
    }
}
