//! Service facade over sessions, the choice ledger, and aggregation
//!
//! Each public method is one unit of work: it acquires a storage scope,
//! runs its steps against that scope, and commits only if every step
//! succeeded. The methods block on SQLite; async callers should run them
//! on a blocking thread.
//!
//! A caller that may give up on a call (for example on a request timeout)
//! hands the service a cancellation flag through
//! [`GameService::with_cancellation`]. The flag is checked right before
//! each commit; once it is set the scope is dropped and rolled back, and
//! the call fails with `DilemmaError::Cancelled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{DilemmaError, Result};
use crate::game::metrics::OperationMetrics;
use crate::game::types::{ChoiceCreate, ChoiceResponse, DilemmaStat, SessionSummary};
use crate::game::{ledger, sessions, stats};
use crate::storage::{Session, SqliteStorage, StorageScope};

/// Entry point for the game operations
#[derive(Clone)]
pub struct GameService {
    storage: Arc<SqliteStorage>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl GameService {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            cancelled: None,
        }
    }

    /// A handle on the same storage whose writes are abandoned once `flag`
    /// is set
    pub fn with_cancellation(&self, flag: Arc<AtomicBool>) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            cancelled: Some(flag),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Commit `scope` unless the caller has cancelled; otherwise roll back
    fn commit(&self, scope: StorageScope) -> Result<()> {
        if self.is_cancelled() {
            drop(scope);
            return Err(DilemmaError::Cancelled(
                "Caller gave up before commit; changes rolled back".to_string(),
            )
            .into());
        }
        scope.commit()
    }

    /// Open the configured database and build the service around it
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = SqliteStorage::new(&config.storage)?;
        tracing::info!("Using database at {}", storage.db_path().display());
        Ok(Self::new(storage))
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    fn observe<T>(&self, operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let metrics = OperationMetrics::new(operation);
        let result = f();
        metrics.record(&result);

        if let Err(err) = &result {
            let operation = metrics.operation();
            match err.downcast_ref::<DilemmaError>() {
                Some(e) if e.is_client_error() => {
                    tracing::debug!(operation, "Rejected request: {}", e)
                }
                Some(e @ DilemmaError::Cancelled(_)) => {
                    tracing::warn!(operation, "{}", e)
                }
                _ => tracing::error!(operation, "Operation failed: {:#}", err),
            }
        }
        result
    }

    /// Create a new open session
    pub fn create_session(&self) -> Result<Session> {
        self.observe("create_session", || {
            let scope = self.storage.scope()?;
            let session = sessions::create_session(&scope)?;
            self.commit(scope)?;
            Ok(session)
        })
    }

    /// Fetch a session by identifier
    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        self.observe("get_session", || {
            let scope = self.storage.read_scope()?;
            sessions::get_session(&scope, session_id)
        })
    }

    /// Record a choice and return it with the current agreement percentage
    pub fn record_choice(&self, session_id: &str, request: &ChoiceCreate) -> Result<ChoiceResponse> {
        self.observe("record_choice", || {
            let scope = self.storage.scope()?;
            let recorded =
                ledger::record_choice(&scope, session_id, &request.dilemma_id, &request.choice)?;
            self.commit(scope)?;
            Ok(recorded)
        })
    }

    /// Current aggregate statistics for a dilemma
    pub fn dilemma_stats(&self, dilemma_id: &str) -> Result<DilemmaStat> {
        self.observe("dilemma_stats", || {
            let scope = self.storage.read_scope()?;
            stats::stats_for(&scope, dilemma_id)
        })
    }

    /// Mark a session complete and summarize everything it answered
    pub fn complete_session(&self, session_id: &str) -> Result<SessionSummary> {
        self.observe("complete_session", || {
            let scope = self.storage.scope()?;
            let session = sessions::complete_session(&scope, session_id)?;
            let summary = stats::stats_for_session(&scope, &session.id)?;
            self.commit(scope)?;

            tracing::info!(
                session_id = %session.id,
                choices = summary.choices.len(),
                "Session completed"
            );

            Ok(SessionSummary {
                session_id: session.id,
                choices: summary.choices,
                stats: summary.stats,
            })
        })
    }

    /// Summarize a session without marking it complete
    pub fn session_summary(&self, session_id: &str) -> Result<SessionSummary> {
        self.observe("session_summary", || {
            let scope = self.storage.read_scope()?;
            let session = sessions::get_session(&scope, session_id)?;
            let summary = stats::stats_for_session(&scope, &session.id)?;

            Ok(SessionSummary {
                session_id: session.id,
                choices: summary.choices,
                stats: summary.stats,
            })
        })
    }

    /// Check that storage is reachable
    pub fn ping(&self) -> Result<()> {
        self.storage.ping()
    }
}
