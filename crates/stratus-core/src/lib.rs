//! # Stratus Core
//!
//! Core domain logic for choosing compute templates across cloud providers.
//!
//! This crate contains pure business logic with no I/O dependencies:
//! - Resource models shared by every provider adapter
//! - Error definitions
//! - Template filtering and ranking
//!
//! ## Design Principles
//!
//! - **Pure Functions**: No side effects, easy to test
//! - **Provider-Agnostic**: Adapters translate vendor machine shapes into these models
//! - **Pluggable Scoring**: Ranking strategies are swappable `Scorer` implementations

pub mod errors;
pub mod models;
pub mod selection;

// Re-export commonly used types
pub use errors::{Result, StratusError};
pub use models::{
    parse_catalog, Architecture, Dimension, ResourceRequirement, ResourceSpec, ScoreWeights,
    TemplateCandidate,
};
pub use selection::{
    qualifies, rank_templates, select_templates, unmet_dimensions, DrfScorer, Mismatch,
    PriceScorer, RankedTemplate, Scorer, TemplateSelector, HOURS_PER_MONTH,
};
