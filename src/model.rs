use serde::{Deserialize, Serialize};

/// One stored word entry. `owner_id` never leaves the service; API payloads
/// use [`crate::api::WordPayload`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: i64,
    pub owner_id: String,
    pub word: String,
    pub is_unfamiliar: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of a save attempt. The duplicate check happens before the insert
/// and is not transactional with it.
#[derive(Debug)]
pub enum SaveOutcome {
    Created(WordEntry),
    Duplicate,
}

/// Result of toggling the familiarity flag on a word.
#[derive(Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Toggled,
    AlreadySet,
    NotFound,
}
