//! Recording choices, one per (session, dilemma) pair

use crate::error::{DilemmaError, Result};
use crate::game::sessions;
use crate::game::stats;
use crate::game::types::ChoiceResponse;
use crate::storage::{DilemmaOption, StorageScope};

/// Longest accepted dilemma identifier, in characters
pub const MAX_DILEMMA_ID_LEN: usize = 100;

fn validate_dilemma_id(dilemma_id: &str) -> Result<()> {
    let len = dilemma_id.chars().count();
    if len == 0 || len > MAX_DILEMMA_ID_LEN {
        return Err(DilemmaError::InvalidInput(format!(
            "dilemma_id must be between 1 and {} characters",
            MAX_DILEMMA_ID_LEN
        ))
        .into());
    }
    Ok(())
}

/// Record a player's choice and report how many players agree with it
///
/// Checks run in order: the session must exist, the option must be `A` or
/// `B`, the dilemma identifier must be well formed, and the session must not
/// have answered this dilemma yet. The returned percentage includes the row
/// just written.
pub fn record_choice(
    scope: &StorageScope,
    session_id: &str,
    dilemma_id: &str,
    raw_option: &str,
) -> Result<ChoiceResponse> {
    sessions::get_session(scope, session_id)?;

    let option: DilemmaOption = raw_option.parse()?;
    validate_dilemma_id(dilemma_id)?;

    if scope.find_choice(session_id, dilemma_id)?.is_some() {
        tracing::warn!(session_id, dilemma_id, "Rejected duplicate choice");
        return Err(
            DilemmaError::Conflict("Choice already recorded for this dilemma".to_string()).into(),
        );
    }

    // The unique index still guards against a concurrent writer slipping in
    // between the check above and this insert.
    let choice = scope.insert_choice(session_id, dilemma_id, option)?;
    let percentage_same = stats::percentage_matching(scope, dilemma_id, option)?;

    tracing::debug!(
        session_id,
        dilemma_id,
        choice = %option,
        percentage_same,
        "Recorded choice"
    );

    Ok(ChoiceResponse::from_choice(choice, percentage_same))
}
