use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DilemmaError;

/// A player's play-through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, globally unique identifier (UUID v4)
    pub id: String,
    /// Assigned by storage at insert time
    pub created_at: DateTime<Utc>,
    /// Absent until the session is completed; never reverts once set
    pub completed_at: Option<DateTime<Utc>>,
}

/// One of the two values a player may pick for a dilemma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DilemmaOption {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
}

impl DilemmaOption {
    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DilemmaOption::A => "A",
            DilemmaOption::B => "B",
        }
    }
}

impl fmt::Display for DilemmaOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DilemmaOption {
    type Err = DilemmaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "A" => Ok(DilemmaOption::A),
            "B" => Ok(DilemmaOption::B),
            _ => Err(DilemmaError::InvalidInput(
                "Choice must be 'A' or 'B'".to_string(),
            )),
        }
    }
}

/// A recorded (session, dilemma, option) fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Storage-assigned sequence number
    pub id: i64,
    pub session_id: String,
    pub dilemma_id: String,
    pub option: DilemmaOption,
    pub created_at: DateTime<Utc>,
}
