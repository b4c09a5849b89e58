//! # Stratus Utils
//!
//! Infrastructure utilities shared by Stratus provider adapters.
//! This crate contains address arithmetic, input parsers, formatters and
//! the convergence poller used to wait on asynchronous cloud operations.

pub mod errors;
pub mod formatters;
pub mod network;
pub mod parsers;
pub mod poller;

// Re-export common types for convenience
pub use errors::*;
pub use formatters::*;
pub use network::*;
pub use parsers::*;
pub use poller::*;
