use tempfile::TempDir;
use dilemma_machine::game::{ChoiceCreate, GameService};
use dilemma_machine::storage::SqliteStorage;

#[allow(dead_code)]
pub fn create_temp_service() -> (GameService, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("dilemma.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (GameService::new(storage), tmp)
}

#[allow(dead_code)]
pub fn choice(dilemma_id: &str, option: &str) -> ChoiceCreate {
    ChoiceCreate {
        dilemma_id: dilemma_id.to_string(),
        choice: option.to_string(),
    }
}
