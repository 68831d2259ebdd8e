//! Free-text date parsing for venue listings.
//!
//! Handles machine-readable ISO stamps, English and French month names,
//! weekday prefixes, date ranges, numeric `MM/DD/YYYY` dates, relative words
//! (`today`, `demain`) and times of day (`7:30pm`, `20h30`, `19:00`).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

use crate::domain::ParsedDateRange;

const MONTH: &str = r"(january|february|march|april|may|june|july|august|september|october|november|december|sept|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)";
const SEP: &str = r"(?:-|to|au|until|through|thru)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in date pattern must compile")
}

static FRENCH_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(janvier|janv|février|fevrier|févr|fevr|fév|mars|avril|avr|mai|juin|juillet|juil|août|aout|aoû|septembre|octobre|novembre|décembre|decembre|déc)\b")
});
static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{1,2})(?:st|nd|rd|th|er|e)\b"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

static ISO_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(\d{4})-(\d{2})-(\d{2})\s*(?:/|-|to|au)\s*(\d{4})-(\d{2})-(\d{2})\b")
});
static ISO_EMBEDDED_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{4})-(\d{2})-(\d{2})(?:[t ](\d{2}):(\d{2}))?"));
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b"));

static CROSS_MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b{m}\.?\s+(\d{{1,2}})(?:,?\s*(\d{{4}}))?\s*{sep}\s*(?:[a-z]+\.?,?\s+)?{m}\.?\s+(\d{{1,2}})\b(?:,?\s*(\d{{4}})\b)?",
        m = MONTH,
        sep = SEP
    ))
});
static DAY_MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})\s+(?:de\s+)?{m}\b\.?(?:,?\s*(\d{{4}}))?\s*{sep}\s*(?:[a-z]+\.?,?\s+)?(\d{{1,2}})\s+(?:de\s+)?{m}\b\.?(?:,?\s*(\d{{4}})\b)?",
        m = MONTH,
        sep = SEP
    ))
});
static SAME_MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b{m}\.?\s+(\d{{1,2}})\s*{sep}\s*(\d{{1,2}})\b(?:,?\s*(\d{{4}})\b)?",
        m = MONTH,
        sep = SEP
    ))
});
static DAYS_THEN_MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})\s*{sep}\s*(\d{{1,2}})\s+(?:de\s+)?{m}\b\.?(?:,?\s*(\d{{4}})\b)?",
        m = MONTH,
        sep = SEP
    ))
});
static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b{m}\.?\s+(\d{{1,2}})\b(?:,?\s*(\d{{4}})\b)?",
        m = MONTH
    ))
});
static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})\s+(?:de\s+)?{m}\b\.?(?:,?\s*(\d{{4}})\b)?",
        m = MONTH
    ))
});
static RELATIVE_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(today|tonight|aujourd'hui|ce soir|tomorrow|demain)\b"));

static MERIDIEM_TIME_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{1,2})(?::([0-5]\d))?\s*([ap])\.?\s?m\b\.?"));
static CLOCK_TIME_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b([01]?\d|2[0-3]):([0-5]\d)\b"));
static FRENCH_TIME_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b([01]?\d|2[0-3])h([0-5]\d)?\b"));
static TIME_TAIL_RE: Lazy<Regex> = Lazy::new(|| compile(r"^\s*(?::|[ap]\.?\s?m\b|h\d|h\b)"));

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|tues|thurs|thur|mon|tue|wed|thu|fri|sat|sun|lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche)\b\.?")
});
static CONNECTOR_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(to|au|at|from|du|le|de|until|through|thru|à)\b"));
static EXPLICIT_YEAR_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b(19|20)\d{2}\b"));

/// Calendar dates matched in a text, before time-of-day is applied.
#[derive(Debug, Clone)]
struct DateMatch {
    start: NaiveDate,
    end: Option<NaiveDate>,
    /// Explicit times carried by the matched expression itself (ISO stamps).
    time: Option<NaiveTime>,
    span: Range<usize>,
}

/// Converts free-text date/time strings into a [`ParsedDateRange`].
///
/// Parsing is total: every failure is `None`, never a panic or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTextParser {
    default_time: NaiveTime,
}

impl Default for DateTextParser {
    fn default() -> Self {
        Self::new(NaiveTime::default())
    }
}

impl DateTextParser {
    /// `default_time` is used whenever the text carries no time of day.
    pub fn new(default_time: NaiveTime) -> Self {
        Self { default_time }
    }

    pub fn default_time(&self) -> NaiveTime {
        self.default_time
    }

    pub fn parse(&self, text: &str, reference_now: NaiveDateTime) -> Option<ParsedDateRange> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(start) = parse_machine_readable(trimmed, self.default_time) {
            return Some(ParsedDateRange::single(start));
        }

        let normalized = normalize(trimmed);
        let found = match_dates(&normalized, reference_now)?;
        let times: Vec<NaiveTime> = find_times(&normalized)
            .into_iter()
            .map(|(_, time)| time)
            .collect();

        let start_time = found
            .time
            .or_else(|| times.first().copied())
            .unwrap_or(self.default_time);
        let start = found.start.and_time(start_time);

        let end = match found.end {
            Some(end_day) => {
                let end_time = times.get(1).copied().unwrap_or(start_time);
                Some(end_day.and_time(end_time))
            }
            None if found.time.is_none() && times.len() >= 2 => {
                // "7pm - 2am" runs past midnight.
                let end_time = times[1];
                let end_day = if end_time < start_time {
                    found.start.succ_opt()?
                } else {
                    found.start
                };
                Some(end_day.and_time(end_time))
            }
            None => None,
        };

        Some(ParsedDateRange::new(start, end))
    }

    /// Finds the first date-like substring in free text (plus an adjacent time),
    /// for containers whose date lives in prose rather than a dedicated element.
    ///
    /// Only absolute dates count here: "today" or "tonight" in running prose
    /// says nothing about when the event happens.
    pub fn locate(&self, text: &str, reference_now: NaiveDateTime) -> Option<String> {
        let normalized = normalize(text);
        let found = match_absolute_dates(&normalized, reference_now)?;
        let mut end = found.span.end;
        for (span, _) in find_times(&normalized) {
            if span.start >= end && span.start - end <= 15 {
                end = span.end;
                break;
            }
        }
        Some(normalized[found.span.start..end].trim().to_string())
    }
}

/// True when the text is nothing but a date expression, e.g. `"Jan 15"` or
/// `"Sat, March 7, 2026 8pm"`.
pub fn is_date_expression(text: &str) -> bool {
    let normalized = normalize(text);
    let patterns: [&Regex; 10] = [
        &ISO_RANGE_RE,
        &ISO_EMBEDDED_RE,
        &NUMERIC_RE,
        &CROSS_MONTH_RANGE_RE,
        &DAY_MONTH_RANGE_RE,
        &SAME_MONTH_RANGE_RE,
        &DAYS_THEN_MONTH_RANGE_RE,
        &MONTH_DAY_RE,
        &DAY_MONTH_RE,
        &RELATIVE_RE,
    ];
    if !patterns.iter().any(|re| re.is_match(&normalized)) {
        return false;
    }

    let mut residue = normalized;
    let strip: [&Regex; 15] = [
        &ISO_RANGE_RE,
        &ISO_EMBEDDED_RE,
        &NUMERIC_RE,
        &CROSS_MONTH_RANGE_RE,
        &DAY_MONTH_RANGE_RE,
        &SAME_MONTH_RANGE_RE,
        &DAYS_THEN_MONTH_RANGE_RE,
        &MONTH_DAY_RE,
        &DAY_MONTH_RE,
        &RELATIVE_RE,
        &MERIDIEM_TIME_RE,
        &CLOCK_TIME_RE,
        &FRENCH_TIME_RE,
        &WEEKDAY_RE,
        &CONNECTOR_RE,
    ];
    for re in strip {
        residue = re.replace_all(&residue, " ").into_owned();
    }
    !residue.chars().any(char::is_alphanumeric)
}

/// True when the text names a four-digit year.
pub fn has_explicit_year(text: &str) -> bool {
    EXPLICIT_YEAR_RE.is_match(text)
}

/// Infers the year of a yearless month: the current year if the month has
/// not passed yet, otherwise next year.
pub fn infer_year(month: u32, reference_now: NaiveDateTime) -> i32 {
    if month >= reference_now.month() {
        reference_now.year()
    } else {
        reference_now.year() + 1
    }
}

fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['–', '—', '‒'], "-");
    let translated = FRENCH_MONTH_RE.replace_all(&lowered, |caps: &Captures| {
        french_month_to_english(&caps[1]).to_string()
    });
    let stripped = ORDINAL_RE.replace_all(&translated, "$1");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

fn french_month_to_english(name: &str) -> &'static str {
    match name {
        "janvier" | "janv" => "january",
        "février" | "fevrier" | "févr" | "fevr" | "fév" => "february",
        "mars" => "march",
        "avril" | "avr" => "april",
        "mai" => "may",
        "juin" => "june",
        "juillet" | "juil" => "july",
        "août" | "aout" | "aoû" => "august",
        "septembre" => "september",
        "octobre" => "october",
        "novembre" => "november",
        _ => "december",
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_machine_readable(text: &str, default_time: NaiveTime) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.naive_local());
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(default_time))
}

fn capture_u32(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn capture_year(caps: &Captures, index: usize) -> Option<i32> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn capture_month(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| month_number(m.as_str()))
}

fn whole_span(caps: &Captures) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or(0..0)
}

fn match_dates(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    match_absolute_dates(text, now).or_else(|| relative(text, now))
}

fn match_absolute_dates(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    iso_range(text)
        .or_else(|| iso_embedded(text))
        .or_else(|| numeric(text))
        .or_else(|| cross_month_range(text, now))
        .or_else(|| day_month_range(text, now))
        .or_else(|| same_month_range(text, now))
        .or_else(|| days_then_month_range(text, now))
        .or_else(|| single_date(text, now))
}

fn iso_range(text: &str) -> Option<DateMatch> {
    let caps = ISO_RANGE_RE.captures(text)?;
    let start = NaiveDate::from_ymd_opt(
        capture_year(&caps, 1)?,
        capture_u32(&caps, 2)?,
        capture_u32(&caps, 3)?,
    )?;
    let end = NaiveDate::from_ymd_opt(
        capture_year(&caps, 4)?,
        capture_u32(&caps, 5)?,
        capture_u32(&caps, 6)?,
    )?;
    Some(DateMatch {
        start,
        end: Some(end),
        time: None,
        span: whole_span(&caps),
    })
}

fn iso_embedded(text: &str) -> Option<DateMatch> {
    let caps = ISO_EMBEDDED_RE.captures(text)?;
    let start = NaiveDate::from_ymd_opt(
        capture_year(&caps, 1)?,
        capture_u32(&caps, 2)?,
        capture_u32(&caps, 3)?,
    )?;
    let time = match (capture_u32(&caps, 4), capture_u32(&caps, 5)) {
        (Some(hour), Some(minute)) => NaiveTime::from_hms_opt(hour, minute, 0),
        _ => None,
    };
    Some(DateMatch {
        start,
        end: None,
        time,
        span: whole_span(&caps),
    })
}

fn numeric(text: &str) -> Option<DateMatch> {
    let caps = NUMERIC_RE.captures(text)?;
    let month = capture_u32(&caps, 1)?;
    let day = capture_u32(&caps, 2)?;
    let mut year = capture_year(&caps, 3)?;
    if year < 100 {
        year += 2000;
    }
    Some(DateMatch {
        start: NaiveDate::from_ymd_opt(year, month, day)?,
        end: None,
        time: None,
        span: whole_span(&caps),
    })
}

/// Resolves the years of a month/day range. A given year belongs to the end
/// date; a start later in the calendar than its end belongs to the year before.
fn resolve_range(
    (start_month, start_day, start_year): (u32, u32, Option<i32>),
    (end_month, end_day, end_year): (u32, u32, Option<i32>),
    now: NaiveDateTime,
) -> Option<(NaiveDate, NaiveDate)> {
    let wraps = (end_month, end_day) < (start_month, start_day);
    let (start_year, end_year) = match (start_year, end_year) {
        (Some(sy), Some(ey)) => (sy, ey),
        (None, Some(ey)) => (if wraps { ey - 1 } else { ey }, ey),
        (Some(sy), None) => (sy, if wraps { sy + 1 } else { sy }),
        (None, None) => {
            let sy = infer_year(start_month, now);
            (sy, if wraps { sy + 1 } else { sy })
        }
    };
    let start = NaiveDate::from_ymd_opt(start_year, start_month, start_day)?;
    let end = NaiveDate::from_ymd_opt(end_year, end_month, end_day)?;
    Some((start, end))
}

fn range_match(start: NaiveDate, end: NaiveDate, caps: &Captures) -> DateMatch {
    DateMatch {
        start,
        end: Some(end),
        time: None,
        span: whole_span(caps),
    }
}

fn cross_month_range(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let caps = CROSS_MONTH_RANGE_RE.captures(text)?;
    let (start, end) = resolve_range(
        (capture_month(&caps, 1)?, capture_u32(&caps, 2)?, capture_year(&caps, 3)),
        (capture_month(&caps, 4)?, capture_u32(&caps, 5)?, capture_year(&caps, 6)),
        now,
    )?;
    Some(range_match(start, end, &caps))
}

fn day_month_range(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let caps = DAY_MONTH_RANGE_RE.captures(text)?;
    let (start, end) = resolve_range(
        (capture_month(&caps, 2)?, capture_u32(&caps, 1)?, capture_year(&caps, 3)),
        (capture_month(&caps, 5)?, capture_u32(&caps, 4)?, capture_year(&caps, 6)),
        now,
    )?;
    Some(range_match(start, end, &caps))
}

fn same_month_range(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let caps = SAME_MONTH_RANGE_RE
        .captures_iter(text)
        .find(|caps| !followed_by_time(text, whole_span(caps).end))?;
    let month = capture_month(&caps, 1)?;
    let year = capture_year(&caps, 4);
    let (start, end) = resolve_range(
        (month, capture_u32(&caps, 2)?, None),
        (month, capture_u32(&caps, 3)?, year),
        now,
    )?;
    Some(range_match(start, end, &caps))
}

fn days_then_month_range(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let caps = DAYS_THEN_MONTH_RANGE_RE.captures(text)?;
    let month = capture_month(&caps, 3)?;
    let year = capture_year(&caps, 4);
    let (start, end) = resolve_range(
        (month, capture_u32(&caps, 1)?, None),
        (month, capture_u32(&caps, 2)?, year),
        now,
    )?;
    Some(range_match(start, end, &caps))
}

/// `"<Month> <Day>"` or `"<Day> <Month>"`, whichever appears first.
fn single_date(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let month_first = MONTH_DAY_RE
        .captures(text)
        .map(|caps| (whole_span(&caps), capture_month(&caps, 1), capture_u32(&caps, 2), capture_year(&caps, 3)));
    let day_first = DAY_MONTH_RE
        .captures(text)
        .map(|caps| (whole_span(&caps), capture_month(&caps, 2), capture_u32(&caps, 1), capture_year(&caps, 3)));

    let chosen = match (month_first, day_first) {
        (Some(a), Some(b)) => {
            if b.0.start < a.0.start {
                b
            } else {
                a
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    let (span, month, day, year) = chosen;
    let month = month?;
    let year = year.unwrap_or_else(|| infer_year(month, now));
    Some(DateMatch {
        start: NaiveDate::from_ymd_opt(year, month, day?)?,
        end: None,
        time: None,
        span,
    })
}

fn relative(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let caps = RELATIVE_RE.captures(text)?;
    let offset = match &caps[1] {
        "tomorrow" | "demain" => 1,
        _ => 0,
    };
    Some(DateMatch {
        start: now.date() + Duration::days(offset),
        end: None,
        time: None,
        span: whole_span(&caps),
    })
}

fn followed_by_time(text: &str, end: usize) -> bool {
    text.get(end..).is_some_and(|rest| TIME_TAIL_RE.is_match(rest))
}

/// Times of day in textual order, without overlapping matches.
fn find_times(text: &str) -> Vec<(Range<usize>, NaiveTime)> {
    let mut hits: Vec<(Range<usize>, NaiveTime)> = Vec::new();

    for caps in MERIDIEM_TIME_RE.captures_iter(text) {
        let Some(hour) = capture_u32(&caps, 1) else { continue };
        if !(1..=12).contains(&hour) {
            continue;
        }
        let minute = capture_u32(&caps, 2).unwrap_or(0);
        let pm = &caps[3] == "p";
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            hits.push((whole_span(&caps), time));
        }
    }

    for re in [&*CLOCK_TIME_RE, &*FRENCH_TIME_RE] {
        for caps in re.captures_iter(text) {
            let (Some(hour), minute) = (capture_u32(&caps, 1), capture_u32(&caps, 2).unwrap_or(0))
            else {
                continue;
            };
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                hits.push((whole_span(&caps), time));
            }
        }
    }

    hits.sort_by_key(|(span, _)| (span.start, std::cmp::Reverse(span.end)));
    let mut out = Vec::new();
    let mut last_end = 0;
    for (span, time) in hits {
        if span.start < last_end {
            continue;
        }
        last_end = span.end;
        out.push((span, time));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_iso_literals() {
        let parser = DateTextParser::default();
        let range = parser.parse("2026-03-01", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 1, 0, 0));

        let range = parser.parse("2026-03-01T19:30:00", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 1, 19, 30));

        let range = parser.parse("2026-03-01T19:30:00-05:00", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 1, 19, 30));
    }

    #[test]
    fn test_year_inference() {
        let parser = DateTextParser::default();
        assert_eq!(
            parser.parse("Feb 10", now()).unwrap().start_date(),
            date(2026, 2, 10)
        );
        assert_eq!(
            parser.parse("Aug 1", now()).unwrap().start_date(),
            date(2025, 8, 1)
        );
    }

    #[test]
    fn test_month_day_and_day_month_round_trip() {
        let parser = DateTextParser::default();
        let d = date(2026, 11, 22);
        for format in ["%B %-d, %Y", "%b %-d %Y", "%-d %B %Y", "%A, %B %-d, %Y", "%a %-d %b %Y"] {
            let text = d.format(format).to_string();
            let parsed = parser.parse(&text, now()).unwrap();
            assert_eq!(parsed.start_date(), d, "format {} -> {}", format, text);
        }
    }

    #[test]
    fn test_weekday_prefix_with_ordinal() {
        let parser = DateTextParser::default();
        let range = parser.parse("Sat 27th December", now()).unwrap();
        assert_eq!(range.start_date(), date(2025, 12, 27));
    }

    #[test]
    fn test_french_dates() {
        let parser = DateTextParser::default();
        let range = parser.parse("Samedi 7 juillet 2026 à 20h30", now()).unwrap();
        assert_eq!(range.start(), at(2026, 7, 7, 20, 30));

        let range = parser.parse("1er décembre", now()).unwrap();
        assert_eq!(range.start_date(), date(2025, 12, 1));

        let range = parser.parse("du 5 au 12 mars 2026", now()).unwrap();
        assert_eq!(range.start_date(), date(2026, 3, 5));
        assert_eq!(range.end().unwrap().date(), date(2026, 3, 12));
    }

    #[test]
    fn test_ranges() {
        let parser = DateTextParser::default();

        let range = parser.parse("March 5 - April 2, 2026", now()).unwrap();
        assert_eq!(range.start_date(), date(2026, 3, 5));
        assert_eq!(range.end().unwrap().date(), date(2026, 4, 2));

        let range = parser.parse("12-14 September 2025", now()).unwrap();
        assert_eq!(range.start_date(), date(2025, 9, 12));
        assert_eq!(range.end().unwrap().date(), date(2025, 9, 14));

        let range = parser.parse("Dec 28 – Jan 3, 2026", now()).unwrap();
        assert_eq!(range.start_date(), date(2025, 12, 28));
        assert_eq!(range.end().unwrap().date(), date(2026, 1, 3));

        let range = parser.parse("July 10-12", now()).unwrap();
        assert_eq!(range.start_date(), date(2025, 7, 10));
        assert_eq!(range.end().unwrap().date(), date(2025, 7, 12));
    }

    #[test]
    fn test_time_of_day_is_merged() {
        let parser = DateTextParser::new(NaiveTime::from_hms_opt(19, 0, 0).unwrap());

        let range = parser.parse("March 1, 2026 7:30pm", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 1, 19, 30));

        // No time in the text: the caller default applies.
        let range = parser.parse("March 1, 2026", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 1, 19, 0));

        let range = parser.parse("Fri Oct 3 2025, 10pm - 2am", now()).unwrap();
        assert_eq!(range.start(), at(2025, 10, 3, 22, 0));
        assert_eq!(range.end(), Some(at(2025, 10, 4, 2, 0)));
    }

    #[test]
    fn test_same_month_range_not_confused_with_time() {
        let parser = DateTextParser::default();
        let range = parser.parse("March 5 - 7pm", now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 5, 19, 0));
        assert_eq!(range.end(), None);
    }

    #[test]
    fn test_numeric_and_relative() {
        let parser = DateTextParser::default();
        assert_eq!(
            parser.parse("11/08/2025", now()).unwrap().start_date(),
            date(2025, 11, 8)
        );
        assert_eq!(
            parser.parse("Tonight at 9pm", now()).unwrap().start(),
            at(2025, 6, 15, 21, 0)
        );
        assert_eq!(
            parser.parse("Tomorrow", now()).unwrap().start_date(),
            date(2025, 6, 16)
        );
    }

    #[test]
    fn test_unparseable_and_invalid_dates_are_none() {
        let parser = DateTextParser::default();
        assert!(parser.parse("", now()).is_none());
        assert!(parser.parse("Check website for dates", now()).is_none());
        assert!(parser.parse("February 30, 2026", now()).is_none());
        assert!(parser.parse("2026-13-45", now()).is_none());
    }

    #[test]
    fn test_locate_finds_inline_date() {
        let parser = DateTextParser::default();
        let text = "Join us for an evening of jazz on Saturday, March 7 at 8:00 pm. Tickets at the door.";
        let found = parser.locate(text, now()).unwrap();
        assert_eq!(found, "march 7 at 8:00 pm.");
        let range = parser.parse(&found, now()).unwrap();
        assert_eq!(range.start(), at(2026, 3, 7, 20, 0));
    }

    #[test]
    fn test_locate_ignores_relative_words_in_prose() {
        let parser = DateTextParser::default();
        assert_eq!(
            parser.locate("Reserve your seat today, details to come.", now()),
            None
        );
        assert_eq!(parser.locate("Ce soir, on danse!", now()), None);

        let found = parser
            .locate("Book today for our show on March 7 at 8pm.", now())
            .unwrap();
        assert_eq!(found, "march 7 at 8pm.");
    }

    #[test]
    fn test_is_date_expression() {
        assert!(is_date_expression("Jan 15"));
        assert!(is_date_expression("Sat, March 7, 2026 8pm"));
        assert!(is_date_expression("2026-03-01"));
        assert!(is_date_expression("Samedi 7 mars 20h30"));
        assert!(is_date_expression("7 mars à 20h"));
        assert!(!is_date_expression("Jazz Night Jan 15"));
        assert!(!is_date_expression("Jazz Night"));
    }

    #[test]
    fn test_has_explicit_year() {
        assert!(has_explicit_year("Nov 8, 2025"));
        assert!(!has_explicit_year("Nov 8"));
    }
}
