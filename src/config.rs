use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::DEFAULT_USER_AGENT;
use crate::domain::{Coordinates, DateGranularity, VenueRef};
use crate::error::{ExtractError, Result};
use crate::pipeline::processing::candidate::MissingDatePolicy;
use crate::pipeline::processing::dedupe::DedupPolicy;
use crate::pipeline::processing::quality_gate::{DEFAULT_MAX_TITLE_LEN, DEFAULT_MIN_TITLE_LEN};

pub const CONFIG_PATH_ENV: &str = "VENUE_EXTRACT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub run: RunConfig,
    pub log: LogConfig,
}

/// `[log]`: the `RUST_LOG` env var still overrides `directive`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub directive: String,
    /// Directory for the daily-rotated JSON log; `None` logs to stderr only.
    pub dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directive: "venue_extract=info".to_string(),
            dir: Some(PathBuf::from("logs")),
            file_name: "venue_extract.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Pause before each request, per worker.
    pub delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 15,
            delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub venues_dir: PathBuf,
    pub output: PathBuf,
    pub max_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            venues_dir: PathBuf::from("venues"),
            output: PathBuf::from("output/events.jsonl"),
            max_concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Loads the config named by `VENUE_EXTRACT_CONFIG`, else `config.toml`.
    /// A missing default file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from(path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from(DEFAULT_CONFIG_PATH)
            }
            Err(_) => {
                info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// One venue's TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VenueConfig {
    pub venue: VenueSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub selectors: SelectorSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VenueSection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Listing page to fetch; also the base for relative links.
    pub url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicySection {
    pub result_cap: Option<usize>,
    pub missing_date: MissingDatePolicy,
    /// Required: which duplicate survives is always the venue's call.
    pub dedup: Option<DedupPolicy>,
    pub dedup_granularity: DateGranularity,
    pub min_title_len: usize,
    pub max_title_len: usize,
    pub junk_patterns: Vec<String>,
    pub replace_default_junk: bool,
    /// `HH:MM` applied when a date has no time of day.
    pub default_time: String,
    pub location_override: bool,
    pub use_json_ld: bool,
    pub require_explicit_year: bool,
    pub drop_past_events: bool,
    pub infer_categories: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            result_cap: None,
            missing_date: MissingDatePolicy::Reject,
            dedup: None,
            dedup_granularity: DateGranularity::Day,
            min_title_len: DEFAULT_MIN_TITLE_LEN,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            junk_patterns: Vec::new(),
            replace_default_junk: false,
            default_time: "00:00".to_string(),
            location_override: false,
            use_json_ld: true,
            require_explicit_year: false,
            drop_past_events: false,
            infer_categories: true,
        }
    }
}

impl PolicySection {
    pub fn dedup_policy(&self) -> Result<DedupPolicy> {
        self.dedup.ok_or_else(|| {
            ExtractError::Config(
                "[policy] dedup must be set to \"first_seen\" or \"highest_score\"".to_string(),
            )
        })
    }

    pub fn default_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.default_time.trim(), "%H:%M").map_err(|e| {
            ExtractError::Config(format!(
                "Invalid default_time '{}': {}",
                self.default_time, e
            ))
        })
    }
}

/// Strategy strings per field; empty lists mean the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorSection {
    pub title: Vec<String>,
    pub date: Vec<String>,
    pub price: Vec<String>,
    pub image: Vec<String>,
    pub link: Vec<String>,
    pub description: Vec<String>,
    pub location: Vec<String>,
    /// Extra container selectors on top of the built-in heuristics.
    pub containers: Vec<String>,
}

impl VenueConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn id(&self) -> &str {
        &self.venue.id
    }

    pub fn venue_ref(&self) -> VenueRef {
        let coordinates = match (self.venue.latitude, self.venue.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        VenueRef {
            name: self.venue.name.clone(),
            address: self.venue.address.clone(),
            city: self.venue.city.clone(),
            coordinates,
        }
    }
}

/// All venue configs of a directory, keyed by venue id.
#[derive(Debug, Clone, Default)]
pub struct VenueRegistry {
    venues: BTreeMap<String, VenueConfig>,
}

impl VenueRegistry {
    /// Loads every `*.toml` file in the directory.
    pub fn load_from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ExtractError::Config(format!(
                "Venue directory does not exist: {}",
                dir.display()
            )));
        }

        let mut venues = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            let content = fs::read_to_string(&path)?;
            let config = VenueConfig::from_toml_str(&content).map_err(|e| {
                ExtractError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            debug!("Loaded venue '{}' from {}", config.id(), path.display());

            if let Some(previous) = venues.insert(config.id().to_string(), config) {
                return Err(ExtractError::Config(format!(
                    "Duplicate venue id '{}' in {}",
                    previous.id(),
                    dir.display()
                )));
            }
        }

        info!("Loaded {} venue configs from {}", venues.len(), dir.display());
        Ok(Self { venues })
    }

    pub fn get(&self, id: &str) -> Option<&VenueConfig> {
        self.venues.get(id)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &VenueConfig> {
        self.venues.values().filter(|v| v.venue.enabled)
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
