//! HTTP handlers for the word endpoints.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rand::seq::SliceRandom;

use crate::api::{ApiResponse, AuthCodeForm, KeywordForm, ReviewForm, WordForm};
use crate::auth::TokenVerifier;
use crate::db::Database;
use crate::model::{SaveOutcome, ToggleOutcome, WordEntry};

/// How many entries `random_words` hands back at most.
const RANDOM_SAMPLE_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub verifier: Arc<TokenVerifier>,
    pub author_code: String,
}

fn success(body: ApiResponse) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn created(body: ApiResponse) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

fn conflict(body: ApiResponse) -> Response {
    (StatusCode::CONFLICT, Json(body)).into_response()
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::fail(msg))).into_response()
}

fn unauthorized(msg: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiResponse::fail(msg))).into_response()
}

fn internal_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::fail(msg)),
    )
        .into_response()
}

/// Turn the bearer token into an owner id, or the 401 the client gets.
/// Header-shape failures keep their specific message; verification
/// failures collapse to one generic message.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, Response> {
    let token = match TokenVerifier::bearer_token(headers) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "rejected request authorization header");
            return Err(unauthorized(&e.to_string()));
        }
    };

    match state.verifier.verify(token) {
        Ok(owner_id) => Ok(owner_id),
        Err(e) => {
            tracing::warn!(error = %crate::unpack_error(&e), "token verification failed");
            Err(unauthorized("authentication failed"))
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    Json(ApiResponse::ok("ok"))
}

pub async fn save_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<WordForm>,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };
    let Some(word) = form.trimmed() else {
        return bad_request("word field is required");
    };

    match state.db.save_word(&owner_id, word).await {
        Ok(SaveOutcome::Created(_)) => created(ApiResponse::ok("word saved")),
        Ok(SaveOutcome::Duplicate) => conflict(ApiResponse::fail("word already exists")),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to save word");
            internal_error("failed to save word")
        }
    }
}

pub async fn delete_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<WordForm>,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };
    let Some(word) = form.trimmed() else {
        return bad_request("word field is required");
    };

    match state.db.delete_word(&owner_id, word).await {
        Ok(true) => success(ApiResponse::ok(&format!("word '{}' deleted", word))),
        Ok(false) => success(ApiResponse::fail("word not found")),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to delete word");
            internal_error("failed to delete word")
        }
    }
}

pub async fn search_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<KeywordForm>,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };
    let Some(keyword) = form.trimmed() else {
        return bad_request("keyword field is required");
    };

    let words = match state.db.list_words(&owner_id, None).await {
        Ok(words) => words,
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to search words");
            return internal_error("failed to search words");
        }
    };

    let needle = keyword.to_lowercase();
    let matches: Vec<String> = words
        .into_iter()
        .filter(|entry| entry.word.to_lowercase().contains(&needle))
        .map(|entry| entry.word)
        .collect();

    if matches.is_empty() {
        return success(ApiResponse::fail("no matching words"));
    }
    success(ApiResponse::with_matches(matches))
}

pub async fn mark_unfamiliar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<WordForm>,
) -> Response {
    toggle_unfamiliar(state, headers, form, true).await
}

pub async fn unmark_unfamiliar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<WordForm>,
) -> Response {
    toggle_unfamiliar(state, headers, form, false).await
}

async fn toggle_unfamiliar(
    state: AppState,
    headers: HeaderMap,
    form: WordForm,
    flag: bool,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };
    let Some(word) = form.trimmed() else {
        return bad_request("word field is required");
    };

    match state.db.set_unfamiliar(&owner_id, word, flag).await {
        Ok(ToggleOutcome::Toggled) => {
            let msg = if flag {
                format!("'{}' marked as unfamiliar", word)
            } else {
                format!("'{}' no longer marked as unfamiliar", word)
            };
            success(ApiResponse::ok(&msg))
        }
        Ok(ToggleOutcome::AlreadySet) => {
            let msg = if flag {
                format!("'{}' is already unfamiliar", word)
            } else {
                format!("'{}' is not marked as unfamiliar", word)
            };
            success(ApiResponse::fail(&msg))
        }
        Ok(ToggleOutcome::NotFound) => success(ApiResponse::fail("word not found")),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to update word");
            internal_error("failed to update word")
        }
    }
}

pub async fn review_words(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ReviewForm>,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };

    match state
        .db
        .list_words(&owner_id, Some(form.unfamiliar_only()))
        .await
    {
        Ok(words) if words.is_empty() => success(ApiResponse::fail("nothing to review")),
        Ok(words) => success(ApiResponse::with_entries(&words)),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to load review words");
            internal_error("failed to load words")
        }
    }
}

pub async fn random_words(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ReviewForm>,
) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };

    match state
        .db
        .list_words(&owner_id, Some(form.unfamiliar_only()))
        .await
    {
        Ok(words) if words.is_empty() => success(ApiResponse::fail("nothing to choose from")),
        Ok(words) => {
            let sample = sample_up_to(words, RANDOM_SAMPLE_LIMIT);
            success(ApiResponse::with_entries(&sample))
        }
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to load random words");
            internal_error("failed to load words")
        }
    }
}

pub async fn load_all_words(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let owner_id = match authenticate(&state, &headers) {
        Ok(owner_id) => owner_id,
        Err(resp) => return resp,
    };

    match state.db.list_words(&owner_id, None).await {
        Ok(words) if words.is_empty() => success(ApiResponse::fail("no words saved yet")),
        Ok(words) => success(ApiResponse::with_entries(&words)),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(e.as_ref()), "failed to load words");
            internal_error("failed to load words")
        }
    }
}

/// Author verification is a shared-secret check, unrelated to user
/// identity. Codes compare case-insensitively.
pub async fn verify_author(
    State(state): State<AppState>,
    Form(form): Form<AuthCodeForm>,
) -> Response {
    if form.normalized() != state.author_code.to_lowercase() {
        return unauthorized("invalid author code");
    }
    success(ApiResponse::ok("author code accepted"))
}

/// Sample without replacement, capped at `limit`.
fn sample_up_to(mut words: Vec<WordEntry>, limit: usize) -> Vec<WordEntry> {
    let mut rng = rand::rng();
    words.shuffle(&mut rng);
    words.truncate(limit);
    words
}
