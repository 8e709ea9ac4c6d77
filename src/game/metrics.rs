//! Operation metrics for the game service
//!
//! # Metrics
//!
//! - `dilemma_operations_total`: Counter of facade operations by outcome
//! - `dilemma_operation_duration_seconds`: Histogram of operation latency
//! - `dilemma_operations_active`: Gauge of operations currently running
//!
//! # Examples
//!
//! ```
//! use dilemma_machine::game::metrics::OperationMetrics;
//!
//! let metrics = OperationMetrics::new("record_choice");
//! metrics.record_outcome("ok");
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::cell::Cell;
use std::time::Instant;

use crate::error::DilemmaError;

/// Metrics collection for a single facade operation
///
/// Not `Send`; create and finish it within the blocking call it measures.
#[derive(Debug)]
pub struct OperationMetrics {
    operation: &'static str,
    start: Instant,
    recorded: Cell<bool>,
}

impl OperationMetrics {
    /// Starts tracking an operation and bumps the active gauge
    pub fn new(operation: &'static str) -> Self {
        increment_gauge!("dilemma_operations_active", 1.0, "operation" => operation);

        Self {
            operation,
            start: Instant::now(),
            recorded: Cell::new(false),
        }
    }

    /// Records the result of the operation
    pub fn record<T>(&self, result: &crate::error::Result<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => outcome_label(err),
        };
        self.record_outcome(outcome);
    }

    /// Records an explicit outcome label; later calls are ignored
    pub fn record_outcome(&self, outcome: &'static str) {
        if self.recorded.get() {
            return;
        }
        self.recorded.set(true);

        histogram!(
            "dilemma_operation_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "operation" => self.operation
        );
        increment_counter!(
            "dilemma_operations_total",
            "operation" => self.operation,
            "outcome" => outcome
        );
        decrement_gauge!("dilemma_operations_active", 1.0, "operation" => self.operation);
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Drop for OperationMetrics {
    fn drop(&mut self) {
        if !self.recorded.get() {
            decrement_gauge!("dilemma_operations_active", 1.0, "operation" => self.operation);
        }
    }
}

/// Short label for an operation failure
pub fn outcome_label(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<DilemmaError>() {
        Some(DilemmaError::NotFound(_)) => "not_found",
        Some(DilemmaError::InvalidInput(_)) => "invalid_input",
        Some(DilemmaError::Conflict(_)) => "conflict",
        Some(DilemmaError::Cancelled(_)) => "cancelled",
        _ => "error",
    }
}

/// Initializes the Prometheus exporter when the `prometheus` feature is on
///
/// A no-op otherwise, and safe to call either way.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
