//! Extraction stages: date parsing, field extraction, container discovery,
//! candidate building, quality gate and deduplication.

pub mod candidate;
pub mod date_parser;
pub mod dedupe;
pub mod discovery;
pub mod field_extractor;
pub mod json_ld;
pub mod normalize;
pub mod quality_gate;

pub use candidate::{BuildPolicy, CandidateBuilder, FieldSpecs, MissingDatePolicy};
pub use date_parser::DateTextParser;
pub use dedupe::{DedupPolicy, Deduplicator};
pub use discovery::{ContainerDiscoverer, ContainerSet};
pub use field_extractor::{FieldExtractor, FieldKind, FieldSpec, Strategy};
pub use quality_gate::{QualityFilter, TitleRules};
