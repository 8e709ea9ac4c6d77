//! Public request/response shapes of the game operations
//!
//! Field names match the JSON wire format served to the game frontend.

use serde::{Deserialize, Serialize};

use crate::storage::{Choice, DilemmaOption};

/// Request to record a choice
///
/// `choice` is kept as a raw string so an out-of-range value is reported as
/// invalid input rather than as a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceCreate {
    pub dilemma_id: String,
    pub choice: String,
}

/// A recorded choice together with how many players agreed with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceResponse {
    pub id: i64,
    pub dilemma_id: String,
    pub choice: DilemmaOption,
    pub session_id: String,
    /// Percentage of all players (this one included) who made the same choice
    pub percentage_same: f64,
}

impl ChoiceResponse {
    pub fn from_choice(choice: Choice, percentage_same: f64) -> Self {
        Self {
            id: choice.id,
            dilemma_id: choice.dilemma_id,
            choice: choice.option,
            session_id: choice.session_id,
            percentage_same,
        }
    }
}

/// Aggregate breakdown of every recorded choice for one dilemma
///
/// `choice_a_count + choice_b_count == total_responses`, and the two
/// percentages sum to exactly 100.0 whenever there is at least one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilemmaStat {
    pub dilemma_id: String,
    pub total_responses: u64,
    pub choice_a_count: u64,
    pub choice_b_count: u64,
    pub choice_a_percentage: f64,
    pub choice_b_percentage: f64,
}

/// Per-choice agreement and per-dilemma statistics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub choices: Vec<ChoiceResponse>,
    pub stats: Vec<DilemmaStat>,
}
