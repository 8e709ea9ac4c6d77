//! Session lifecycle: open on creation, completed on request

use uuid::Uuid;

use crate::error::{DilemmaError, Result};
use crate::storage::{Session, StorageScope};

/// Allocate and persist a new open session
pub fn create_session(scope: &StorageScope) -> Result<Session> {
    let id = Uuid::new_v4().to_string();
    let session = scope.insert_session(&id)?;
    tracing::debug!(session_id = %session.id, "Created session");
    Ok(session)
}

/// Look up a session, failing with `NotFound` if it does not exist
pub fn get_session(scope: &StorageScope, id: &str) -> Result<Session> {
    scope
        .get_session(id)?
        .ok_or_else(|| DilemmaError::NotFound("Session not found".to_string()).into())
}

/// Mark a session complete
///
/// Completing an already-completed session is allowed; the stored
/// completion time never moves backwards.
pub fn complete_session(scope: &StorageScope, id: &str) -> Result<Session> {
    let session = scope
        .mark_completed(id)?
        .ok_or_else(|| DilemmaError::NotFound("Session not found".to_string()))?;
    tracing::debug!(session_id = %session.id, completed_at = ?session.completed_at, "Completed session");
    Ok(session)
}
