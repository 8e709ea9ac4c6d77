//! Game core: sessions, the choice ledger, and aggregate statistics
//!
//! - `sessions`: create, look up, and complete sessions
//! - `ledger`: record one choice per (session, dilemma) pair
//! - `stats`: per-dilemma and per-session percentages
//! - `service`: the facade composing the above into unit-of-work operations
//! - `metrics`: operation counters and latency histograms

pub mod ledger;
pub mod metrics;
pub mod service;
pub mod sessions;
pub mod stats;
pub mod types;

pub use service::GameService;
pub use types::{ChoiceCreate, ChoiceResponse, DilemmaStat, SessionSummary};
