use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::model::WordEntry;

/// The uniform response envelope. `message` and `words` are dropped from
/// the payload when unset.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<JsonValue>,
}

/// Word fields exposed over the wire. The owner is implied by the token.
#[derive(Debug, Serialize, Deserialize)]
pub struct WordPayload {
    pub id: i64,
    pub word: String,
    pub is_unfamiliar: bool,
}

impl From<&WordEntry> for WordPayload {
    fn from(entry: &WordEntry) -> Self {
        WordPayload {
            id: entry.id,
            word: entry.word.clone(),
            is_unfamiliar: entry.is_unfamiliar,
        }
    }
}

impl ApiResponse {
    pub fn ok(msg: &str) -> Self {
        ApiResponse {
            success: true,
            message: Some(msg.to_owned()),
            words: None,
        }
    }

    pub fn fail(msg: &str) -> Self {
        ApiResponse {
            success: false,
            message: Some(msg.to_owned()),
            words: None,
        }
    }

    pub fn with_entries(entries: &[WordEntry]) -> Self {
        let payloads: Vec<WordPayload> = entries.iter().map(WordPayload::from).collect();
        ApiResponse {
            success: true,
            message: None,
            words: serde_json::to_value(payloads).ok(),
        }
    }

    /// Bare word strings, the wire shape of `search_word`.
    pub fn with_matches(words: Vec<String>) -> Self {
        ApiResponse {
            success: true,
            message: None,
            words: serde_json::to_value(words).ok(),
        }
    }
}

// ============================================================================
// Form inputs, one struct per endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WordForm {
    pub word: Option<String>,
}

impl WordForm {
    /// The trimmed word, or `None` when the field is missing or blank.
    pub fn trimmed(&self) -> Option<&str> {
        self.word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct KeywordForm {
    pub keyword: Option<String>,
}

impl KeywordForm {
    pub fn trimmed(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub is_unfamiliar: Option<String>,
}

impl ReviewForm {
    /// Only the literal string "true" selects unfamiliar words; anything
    /// else (including a missing field) selects familiar ones.
    pub fn unfamiliar_only(&self) -> bool {
        self.is_unfamiliar.as_deref() == Some("true")
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthCodeForm {
    pub auth_code: Option<String>,
}

impl AuthCodeForm {
    pub fn normalized(&self) -> String {
        self.auth_code
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}
