pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod tasks;

pub use domain::{EventCandidate, ParsedDateRange, Rejection, RejectionReason, VenueRef};
pub use error::{ExtractError, Result};
pub use pipeline::{ExtractionPipeline, ExtractionReport};
