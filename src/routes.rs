use axum::{
    Router,
    routing::{get, post},
};

use crate::assets::{serve_embedded, serve_index};
use crate::handler::{
    AppState, delete_word, healthcheck, load_all_words, mark_unfamiliar, random_words,
    review_words, save_word, search_word, unmark_unfamiliar, verify_author,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(healthcheck))
        .route("/save_word", post(save_word))
        .route("/delete_word", post(delete_word))
        .route("/search_word", post(search_word))
        .route("/mark_unfamiliar", post(mark_unfamiliar))
        .route("/unmark_unfamiliar", post(unmark_unfamiliar))
        .route("/review_words", post(review_words))
        .route("/random_words", post(random_words))
        .route("/load_all_words", post(load_all_words))
        .route("/verify_author", post(verify_author))
        .fallback(serve_embedded)
}
