//! Dilemma Machine - backend for a two-option dilemma game
//!
//! Records player choices across independent play sessions and reports
//! what fraction of all players picked each option.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: SQLite persistence gateway and per-operation storage scopes
//! - `game`: sessions, the choice ledger, aggregation, and the service facade
//! - `api`: HTTP routes over the service facade
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use dilemma_machine::game::{ChoiceCreate, GameService};
//! use dilemma_machine::storage::SqliteStorage;
//!
//! fn main() -> anyhow::Result<()> {
//!     let service = GameService::new(SqliteStorage::new_with_path("dilemma.db")?);
//!     let session = service.create_session()?;
//!     let recorded = service.record_choice(
//!         &session.id,
//!         &ChoiceCreate {
//!             dilemma_id: "trolley".to_string(),
//!             choice: "A".to_string(),
//!         },
//!     )?;
//!     println!("{}% agree", recorded.percentage_same);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod game;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{DilemmaError, Result};
pub use game::GameService;
