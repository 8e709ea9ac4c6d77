//! Command handlers for the CLI
//!
//! - `serve`: run the HTTP service
//! - `stats`: print dilemma statistics and session summaries

pub mod serve;
pub mod stats;
