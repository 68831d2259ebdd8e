//! Declarative per-field extraction with ordered fallback strategies.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::constants::{
    DEFAULT_DATE_STRATEGIES, DEFAULT_DESCRIPTION_STRATEGIES, DEFAULT_IMAGE_STRATEGIES,
    DEFAULT_LINK_STRATEGIES, DEFAULT_LOCATION_STRATEGIES, DEFAULT_PRICE_STRATEGIES,
    DEFAULT_TITLE_STRATEGIES,
};
use crate::error::{ExtractError, Result};

static ATTR_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_:][A-Za-z0-9_:.\-]*$").expect("attribute name pattern"));
static TITLE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[—–]\s+|\s*\|\s+").expect("title break pattern"));

/// The logical field a [`FieldSpec`] extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Title,
    DateText,
    PriceText,
    ImageUrl,
    LinkUrl,
    Description,
    Location,
}

impl FieldKind {
    pub fn is_url(self) -> bool {
        matches!(self, FieldKind::ImageUrl | FieldKind::LinkUrl)
    }

    fn default_strategies(self) -> &'static [&'static str] {
        match self {
            FieldKind::Title => DEFAULT_TITLE_STRATEGIES,
            FieldKind::DateText => DEFAULT_DATE_STRATEGIES,
            FieldKind::PriceText => DEFAULT_PRICE_STRATEGIES,
            FieldKind::ImageUrl => DEFAULT_IMAGE_STRATEGIES,
            FieldKind::LinkUrl => DEFAULT_LINK_STRATEGIES,
            FieldKind::Description => DEFAULT_DESCRIPTION_STRATEGIES,
            FieldKind::Location => DEFAULT_LOCATION_STRATEGIES,
        }
    }

    fn default_min_len(self) -> usize {
        match self {
            FieldKind::Title => 5,
            FieldKind::DateText => 4,
            FieldKind::Location => 3,
            _ => 1,
        }
    }

    fn default_max_len(self) -> Option<usize> {
        match self {
            FieldKind::Title => Some(250),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Target {
    Container,
    Descendant(Selector),
    Closest(Selector),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Text,
    Attribute(String),
}

/// One way to read a field: a target node plus text-or-attribute.
///
/// Written as `"css"`, `"css@attr"`, `"@attr"` (the container itself) or
/// `"closest:css@attr"` (nearest matching ancestor).
#[derive(Debug, Clone)]
pub struct Strategy {
    raw: String,
    target: Target,
    source: ValueSource,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

fn brackets_balanced(css: &str) -> bool {
    css.matches('[').count() == css.matches(']').count()
}

impl Strategy {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (closest, rest) = match trimmed.strip_prefix("closest:") {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let (css, source) = match rest.rsplit_once('@') {
            Some((css, attr)) if ATTR_NAME_RE.is_match(attr) && brackets_balanced(css) => {
                (css.trim(), ValueSource::Attribute(attr.to_string()))
            }
            _ => (rest, ValueSource::Text),
        };

        let target = match (closest, css.is_empty()) {
            (_, true) if !closest => Target::Container,
            (true, true) => {
                return Err(ExtractError::InvalidSelector {
                    selector: raw.to_string(),
                    reason: "closest: needs a selector".to_string(),
                })
            }
            (true, false) => Target::Closest(parse_selector(css)?),
            _ => Target::Descendant(parse_selector(css)?),
        };

        Ok(Self {
            raw: raw.to_string(),
            target,
            source,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    fn resolve<'a>(&self, container: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match &self.target {
            Target::Container => Some(container),
            Target::Descendant(selector) => container.select(selector).next(),
            Target::Closest(selector) => {
                let mut current = container.parent().and_then(ElementRef::wrap);
                while let Some(el) = current {
                    if selector.matches(&el) {
                        return Some(el);
                    }
                    current = el.parent().and_then(ElementRef::wrap);
                }
                None
            }
        }
    }

    fn read(&self, el: ElementRef<'_>) -> Option<String> {
        match &self.source {
            ValueSource::Text => Some(el.text().collect::<Vec<_>>().join("\n")),
            ValueSource::Attribute(name) => {
                let value = el.value().attr(name)?;
                if name == "srcset" {
                    // First candidate of "a.jpg 1x, b.jpg 2x".
                    value
                        .split(',')
                        .next()
                        .and_then(|c| c.split_whitespace().next())
                        .map(str::to_string)
                } else {
                    Some(value.to_string())
                }
            }
        }
    }
}

/// Ordered fallback strategies for one logical field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    kind: FieldKind,
    strategies: Vec<Strategy>,
    min_len: usize,
    max_len: Option<usize>,
    first_line_fallback: bool,
}

impl FieldSpec {
    /// Strict constructor: an unparsable selector is a configuration error.
    pub fn new<S: AsRef<str>>(kind: FieldKind, strategies: &[S]) -> Result<Self> {
        let strategies = strategies
            .iter()
            .map(|s| Strategy::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_strategies(kind, strategies))
    }

    /// Lenient constructor: unparsable selectors are logged and skipped.
    pub fn lenient<S: AsRef<str>>(kind: FieldKind, strategies: &[S]) -> Self {
        let strategies = strategies
            .iter()
            .filter_map(|s| match Strategy::parse(s.as_ref()) {
                Ok(strategy) => Some(strategy),
                Err(e) => {
                    warn!("Skipping {:?} strategy: {}", kind, e);
                    None
                }
            })
            .collect();
        Self::from_strategies(kind, strategies)
    }

    /// The built-in strategies for a field.
    pub fn defaults_for(kind: FieldKind) -> Self {
        let spec = Self::lenient(kind, kind.default_strategies());
        if kind == FieldKind::Title {
            spec.with_first_line_fallback(true)
        } else {
            spec
        }
    }

    fn from_strategies(kind: FieldKind, strategies: Vec<Strategy>) -> Self {
        Self {
            kind,
            strategies,
            min_len: kind.default_min_len(),
            max_len: kind.default_max_len(),
            first_line_fallback: false,
        }
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// Allows falling back to the container's first text line.
    pub fn with_first_line_fallback(mut self, enabled: bool) -> Self {
        self.first_line_fallback = enabled;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    fn accepts(&self, value: &str) -> bool {
        let len = value.chars().count();
        len > 0 && len >= self.min_len && self.max_len.map_or(true, |max| len <= max)
    }
}

/// Collapses all runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-empty line, cut at an em dash or pipe separator.
pub fn clean_title(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let head = TITLE_BREAK_RE.split(line).next().unwrap_or(line);
    collapse_whitespace(head)
}

/// All text of an element, one space between text nodes.
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Resolves a scraped link against the page's base URL.
///
/// Absolute URLs pass through, root-relative paths are joined to the origin and
/// bare relative paths are appended to the base with a `/`. Non-navigable
/// values (`#`, `javascript:`, `mailto:`, inline `data:`) yield `None`.
pub fn normalize_url(raw: Option<&str>, base: &Url) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.starts_with('#') {
        return None;
    }
    let lowered = value.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Url::parse(value).ok().map(|_| value.to_string());
    }
    if value.starts_with("//") {
        let joined = format!("{}:{}", base.scheme(), value);
        return Url::parse(&joined).ok().map(|url| url.to_string());
    }
    if value.starts_with('/') {
        return base.join(value).ok().map(|url| url.to_string());
    }

    let relative = value.trim_start_matches("./");
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), relative);
    Url::parse(&joined).ok().map(|url| url.to_string())
}

/// Reads fields out of containers; total, never fails.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    base_url: Url,
}

impl FieldExtractor {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// First strategy whose cleaned value passes the field's length checks.
    pub fn extract(&self, container: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
        for strategy in &spec.strategies {
            let Some(el) = strategy.resolve(container) else {
                continue;
            };
            let Some(raw) = strategy.read(el) else {
                continue;
            };
            if let Some(value) = self.clean(spec.kind, &raw) {
                if spec.accepts(&value) {
                    return Some(value);
                }
            }
        }

        if spec.first_line_fallback {
            let value = clean_title(&container.text().collect::<Vec<_>>().join("\n"));
            if spec.accepts(&value) {
                return Some(value);
            }
        }

        debug!(field = ?spec.kind, "no strategy matched");
        None
    }

    fn clean(&self, kind: FieldKind, raw: &str) -> Option<String> {
        if kind.is_url() {
            return normalize_url(Some(raw), &self.base_url);
        }
        let value = match kind {
            FieldKind::Title => clean_title(raw),
            _ => collapse_whitespace(raw),
        };
        (!value.is_empty()).then_some(value)
    }
}
