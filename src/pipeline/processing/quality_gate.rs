//! Quality gate: title plausibility checks, scoring and the optional top-N cap.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::constants::{DEFAULT_JUNK_TITLE_PATTERNS, EVENT_URL_SEGMENTS, SHOWCASE_KEYWORDS};
use crate::domain::{EventCandidate, Rejection, RejectionReason};
use crate::error::Result;
use crate::pipeline::processing::date_parser::is_date_expression;

static DEFAULT_JUNK: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_JUNK_TITLE_PATTERNS
        .iter()
        .map(|p| compile_junk(p).expect("built-in junk pattern"))
        .collect()
});
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern"));

fn compile_junk(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

pub const DEFAULT_MIN_TITLE_LEN: usize = 5;
pub const DEFAULT_MAX_TITLE_LEN: usize = 200;

/// Title checks shared by the candidate builder (early rejection) and the gate.
#[derive(Debug, Clone)]
pub struct TitleRules {
    min_len: usize,
    max_len: usize,
    junk: Vec<Regex>,
}

impl Default for TitleRules {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_TITLE_LEN,
            max_len: DEFAULT_MAX_TITLE_LEN,
            junk: DEFAULT_JUNK.clone(),
        }
    }
}

impl TitleRules {
    /// Builds rules with extra blocklist patterns, optionally replacing the built-ins.
    pub fn new<S: AsRef<str>>(
        min_len: usize,
        max_len: usize,
        extra_junk: &[S],
        replace_default_junk: bool,
    ) -> Result<Self> {
        let mut junk = if replace_default_junk {
            Vec::new()
        } else {
            DEFAULT_JUNK.clone()
        };
        for pattern in extra_junk {
            junk.push(compile_junk(pattern.as_ref())?);
        }
        Ok(Self {
            min_len,
            max_len,
            junk,
        })
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Checks length bounds, the junk blocklist and date-only titles, in that order.
    pub fn check(&self, title: &str) -> std::result::Result<(), RejectionReason> {
        let title = title.trim();
        let len = title.chars().count();
        if len == 0 {
            return Err(RejectionReason::MissingTitle);
        }
        if len < self.min_len {
            return Err(RejectionReason::TitleTooShort {
                len,
                min: self.min_len,
            });
        }
        if len > self.max_len {
            return Err(RejectionReason::TitleTooLong {
                len,
                max: self.max_len,
            });
        }
        if let Some(pattern) = self.junk.iter().find(|re| re.is_match(title)) {
            return Err(RejectionReason::BlockedTitle {
                pattern: pattern.as_str().to_string(),
            });
        }
        if is_date_expression(title) {
            return Err(RejectionReason::DateOnlyTitle);
        }
        Ok(())
    }
}

/// Output of [`QualityFilter::filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<EventCandidate>,
    pub rejections: Vec<Rejection>,
}

/// Scores candidates and drops implausible ones.
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    rules: TitleRules,
    /// Keep only the N best-scored candidates when set.
    result_cap: Option<usize>,
}

impl QualityFilter {
    pub fn new(rules: TitleRules, result_cap: Option<usize>) -> Self {
        Self { rules, result_cap }
    }

    pub fn rules(&self) -> &TitleRules {
        &self.rules
    }

    /// Additive plausibility score.
    pub fn score(&self, candidate: &EventCandidate) -> f64 {
        let mut score = 0.0;

        if candidate.date_range.is_some() {
            score += 4.0;
        }

        if candidate.description_extracted {
            score += if candidate.description.chars().count() > 50 {
                3.0
            } else {
                1.0
            };
        }

        let url = candidate.url.to_lowercase();
        if EVENT_URL_SEGMENTS.iter().any(|segment| url.contains(segment)) {
            score += 2.0;
        }

        if candidate.location_text.is_some() {
            score += 2.0;
        }

        let title = candidate.title.to_lowercase();
        if SHOWCASE_KEYWORDS.iter().any(|kw| title.contains(kw)) {
            score += 2.0;
        }
        let year_in_date = candidate
            .date_text
            .as_deref()
            .is_some_and(|text| YEAR_RE.is_match(text));
        if YEAR_RE.is_match(&title) || year_in_date {
            score += 1.0;
        }
        if title.chars().count() > 25 {
            score += 1.0;
        }

        score
    }

    /// Rejects implausible candidates, scores the rest and applies the cap.
    ///
    /// Without a cap, survivors keep their input order; with one, they are
    /// stably sorted by descending score before truncation.
    pub fn filter(&self, candidates: Vec<EventCandidate>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for mut candidate in candidates {
            if let Err(reason) = self.rules.check(&candidate.title) {
                debug!(title = %candidate.title, reason = reason.label(), "Candidate rejected");
                outcome.rejections.push(Rejection {
                    reason,
                    container: candidate.url.clone(),
                    title: Some(candidate.title),
                });
                continue;
            }
            candidate.quality_score = self.score(&candidate);
            outcome.kept.push(candidate);
        }

        if let Some(cap) = self.result_cap {
            outcome
                .kept
                .sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
            if outcome.kept.len() > cap {
                for dropped in outcome.kept.split_off(cap) {
                    outcome.rejections.push(Rejection {
                        reason: RejectionReason::BelowCap,
                        container: dropped.url.clone(),
                        title: Some(dropped.title),
                    });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateSource, DateGranularity, ParsedDateRange, VenueRef};
    use chrono::NaiveDate;

    fn candidate(title: &str, dated: bool) -> EventCandidate {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        EventCandidate {
            title: title.to_string(),
            date_range: dated.then(|| ParsedDateRange::single(start)),
            venue: VenueRef::new("The Rex", "194 Queen St W", "Toronto"),
            price_text: None,
            image_url: None,
            url: "https://therex.ca/".to_string(),
            description: format!("{} at The Rex", title),
            categories: vec![],
            location_text: None,
            date_text: None,
            source: CandidateSource::Html,
            description_extracted: false,
            quality_score: 0.0,
            key_granularity: DateGranularity::Day,
        }
    }

    #[test]
    fn test_title_rules() {
        let rules = TitleRules::default();
        assert_eq!(rules.check("Jazz Night"), Ok(()));
        assert_eq!(rules.check("   "), Err(RejectionReason::MissingTitle));
        assert!(matches!(
            rules.check("Show"),
            Err(RejectionReason::TitleTooShort { len: 4, min: 5 })
        ));
        assert!(matches!(
            rules.check(&"x".repeat(201)),
            Err(RejectionReason::TitleTooLong { .. })
        ));
        assert!(matches!(
            rules.check("Subscribe"),
            Err(RejectionReason::BlockedTitle { .. })
        ));
        assert!(matches!(
            rules.check("VIEW ALL EVENTS"),
            Err(RejectionReason::BlockedTitle { .. })
        ));
        assert!(matches!(
            rules.check("Décembre"),
            Err(RejectionReason::BlockedTitle { .. })
        ));
        assert_eq!(rules.check("Jan 15"), Err(RejectionReason::DateOnlyTitle));
        assert_eq!(
            rules.check("Saturday, March 7 at 8pm"),
            Err(RejectionReason::DateOnlyTitle)
        );
        assert_eq!(rules.check("March Madness Trivia"), Ok(()));
    }

    #[test]
    fn test_custom_junk_patterns() {
        let rules = TitleRules::new(3, 100, &["^gift cards?$"], true).unwrap();
        assert!(rules.check("Gift Card").is_err());
        assert_eq!(rules.check("Subscribe"), Ok(()));

        assert!(TitleRules::new(3, 100, &["(unclosed"], false).is_err());
    }

    #[test]
    fn test_scoring_weights() {
        let filter = QualityFilter::default();
        let bare = candidate("Open Mic", false);
        assert_eq!(filter.score(&bare), 0.0);

        let mut rich = candidate("The Northern Lights Tour 2026 Finale", true);
        rich.url = "https://venue.example.com/events/northern-lights".to_string();
        rich.location_text = Some("Main Stage".to_string());
        rich.description = "An evening of music under the stars with special guests and a full band.".to_string();
        rich.description_extracted = true;
        // 4 date + 3 description + 2 url + 2 location + 2 keyword + 1 year + 1 length
        assert_eq!(filter.score(&rich), 15.0);

        // A year in the date text counts once, same as one in the title.
        rich.date_text = Some("Saturday, March 7, 2026".to_string());
        assert_eq!(filter.score(&rich), 15.0);

        let mut dated_text = candidate("Open Mic", false);
        dated_text.date_text = Some("Nov 8, 2025".to_string());
        assert_eq!(filter.score(&dated_text), 1.0);
    }

    #[test]
    fn test_cap_keeps_best_and_is_stable() {
        let filter = QualityFilter::new(TitleRules::default(), Some(2));
        let input = vec![
            candidate("Undated Gig One", false),
            candidate("Dated Gig One", true),
            candidate("Undated Gig Two", false),
            candidate("Dated Gig Two", true),
        ];

        let outcome = filter.filter(input);
        let titles: Vec<_> = outcome.kept.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Dated Gig One", "Dated Gig Two"]);
        assert_eq!(outcome.rejections.len(), 2);
        assert!(outcome
            .rejections
            .iter()
            .all(|r| r.reason == RejectionReason::BelowCap));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = vec![
            candidate("Subscribe", true),
            candidate("Jan 15", true),
            candidate("Undated Gig", false),
            candidate("Jazz Night", true),
            candidate("Blues Brunch", true),
        ];

        for cap in [None, Some(2)] {
            let filter = QualityFilter::new(TitleRules::default(), cap);
            let once = filter.filter(input.clone()).kept;
            let twice = filter.filter(once.clone());
            assert_eq!(twice.kept, once);
            assert!(twice.rejections.is_empty());
        }
    }
}
