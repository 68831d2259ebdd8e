//! Built-in selector lists, junk-title patterns and keyword tables.
//!
//! Venue configs can extend or replace most of these; the defaults are the
//! selectors that work across the bulk of WordPress, Squarespace and custom
//! venue calendars.

/// Selectors that directly identify event-card-like containers.
pub const DEFAULT_CONTAINER_SELECTORS: &[&str] = &[
    ".event",
    "[class*=\"event\"]",
    "[class*=\"Event\"]",
    "[id*=\"event\"]",
    ".show",
    "[class*=\"show\"]",
    ".concert",
    "[class*=\"concert\"]",
    "[class*=\"performance\"]",
    ".listing",
    "[class*=\"listing\"]",
    "article",
    ".card",
    "[class*=\"card\"]",
    ".entry",
    ".post",
    ".list-item",
    "li[class*=\"item\"]",
    "[data-event]",
    "[data-show]",
    "[data-performance]",
    "[data-date]",
];

/// Selectors for elements that usually carry an event date.
pub const DEFAULT_DATE_ANCHOR_SELECTORS: &[&str] =
    &["[datetime]", "time", ".date", "[class*=\"date\"]"];

/// How many ancestors of a date anchor are considered containers.
pub const DEFAULT_ASCENT_DEPTH: usize = 4;

/// Per-selector caps; a listing page rarely holds more real events than this.
pub const DEFAULT_MAX_PER_SELECTOR: usize = 100;
pub const DEFAULT_MAX_DATE_ANCHORS: usize = 50;

pub const DEFAULT_TITLE_STRATEGIES: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    ".title",
    "[class*=\"title\"]",
    "[class*=\"Title\"]",
    ".name",
    "[class*=\"name\"]",
    ".headline",
    "[class*=\"headline\"]",
    "a[href*=\"/event\"]",
    "a[href*=\"/show\"]",
    "strong",
    "[class*=\"artist\"]",
    "a",
];

pub const DEFAULT_DATE_STRATEGIES: &[&str] = &[
    "[datetime]@datetime",
    "@datetime",
    "@data-date",
    "[data-date]@data-date",
    "time",
    ".date",
    "[class*=\"date\"]",
    "[class*=\"Date\"]",
    ".when",
    ".schedule",
    ".datetime",
    "[class*=\"time\"]",
    "[class*=\"day\"]",
];

pub const DEFAULT_PRICE_STRATEGIES: &[&str] = &[
    ".price",
    "[class*=\"price\"]",
    ".cost",
    "[class*=\"ticket\"]",
    ".admission",
];

pub const DEFAULT_IMAGE_STRATEGIES: &[&str] = &[
    "img@src",
    "img@data-src",
    "img@data-lazy-src",
    "source@srcset",
    "[style*=\"background-image\"]@data-bg",
];

pub const DEFAULT_LINK_STRATEGIES: &[&str] = &[
    "a[href*=\"/event\"]@href",
    "a[href*=\"/show\"]@href",
    "a@href",
    "@href",
    "closest:a@href",
];

pub const DEFAULT_DESCRIPTION_STRATEGIES: &[&str] = &[
    ".description",
    "[class*=\"description\"]",
    ".excerpt",
    ".summary",
    ".details",
    "p",
];

pub const DEFAULT_LOCATION_STRATEGIES: &[&str] =
    &[".location", ".venue", ".address", ".where", "[class*=\"venue\"]"];

/// Titles matching any of these (case-insensitive) are navigation or boilerplate.
pub const DEFAULT_JUNK_TITLE_PATTERNS: &[&str] = &[
    r"^(menu|nav|skip|login|log in|subscribe|search|home|view all|load more|filter|sort|click|read more|learn more|see all)\b",
    r"^(stay in the know|join|sign up|newsletter|follow|connect|share)\b",
    r"^(today|tomorrow|this week|this month|upcoming|past|calendar)$",
    r"^(about|contact|donate|membership|hours|directions|tickets|buy tickets|get tickets|book now|more info)$",
    r"^(past|upcoming|all) events$",
    r"^(see|view) all events",
    r"^latest past events",
    r"^list of events",
    r"^events at our",
    r"share to|opens in a new window|click here",
    r"^(january|february|march|april|may|june|july|august|september|october|november|december)$",
    r"^(monday|tuesday|wednesday|thursday|friday|saturday|sunday)$",
    r"^(janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)$",
    r"^(lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche)$",
    r"^(accueil|rechercher|s'abonner|infolettre|voir tout|en savoir plus|billets)$",
    r"^(facebook|twitter|instagram|linkedin|youtube|tiktok|email|print)$",
    r"information session|orientation session",
];

/// Keywords that make a title look like a real show; used by scoring.
pub const SHOWCASE_KEYWORDS: &[&str] = &["tour", "festival", "concert"];

/// URL path segments that point at an event detail page.
pub const EVENT_URL_SEGMENTS: &[&str] = &[
    "/event", "/show", "/concert", "/performance", "/festival", "/calendar/", "/spectacle",
];

/// Keyword to category mapping; the first hit of each category wins.
pub const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("concert", "Music"),
    ("music", "Music"),
    ("jazz", "Music"),
    ("dj", "Music"),
    ("festival", "Festival"),
    ("fest ", "Festival"),
    ("comedy", "Comedy"),
    ("stand-up", "Comedy"),
    ("theatre", "Theatre"),
    ("theater", "Theatre"),
    ("musical", "Theatre"),
    ("opera", "Theatre"),
    ("ballet", "Dance"),
    ("dance", "Dance"),
    ("exhibition", "Arts"),
    ("gallery", "Arts"),
    ("museum", "Arts"),
    ("film", "Film"),
    ("screening", "Film"),
    ("workshop", "Workshop"),
    ("family", "Family"),
    ("kids", "Family"),
    ("food", "Food & Drink"),
    ("wine", "Food & Drink"),
    ("beer", "Food & Drink"),
    ("halloween", "Holiday"),
    ("christmas", "Holiday"),
];

pub const DEFAULT_PRICE_TEXT: &str = "Contact venue";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
