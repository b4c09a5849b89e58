//! # Stratus
//!
//! Provider-neutral building blocks for provisioning cloud machines:
//! template selection, host address ranges and convergence polling.
//!
//! This crate re-exports the workspace members so adapters can depend on a
//! single crate.

pub use stratus_core::{
    rank_templates, select_templates, Architecture, DrfScorer, PriceScorer, RankedTemplate,
    ResourceRequirement, ResourceSpec, ScoreWeights, Scorer, StratusError, TemplateCandidate,
    TemplateSelector,
};
pub use stratus_utils::{
    get_host_range, poll, poll_async, AddressRange, CancelToken, CidrBlock, PollOutcome,
    PollPolicy, UtilsError,
};
