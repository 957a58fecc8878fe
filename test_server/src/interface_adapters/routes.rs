use crate::interface_adapters::handlers::guest::{
    abandon_attempt, clear_guest, complete_attempt, current_attempt, get_guest, init_guest,
    record_response, start_attempt,
};
use crate::interface_adapters::handlers::pages::{test_metadata, test_page};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    // Wire the HTTP routes to their handlers.
    Router::new()
        .route("/tests/{slug}", get(test_page))
        .route("/tests/{slug}/metadata", get(test_metadata))
        .route("/guest/init", post(init_guest))
        .route("/guest", get(get_guest).delete(clear_guest))
        .route("/guest/attempts", post(start_attempt))
        .route("/guest/attempts/current", get(current_attempt))
        .route("/guest/attempts/{attempt_id}/responses", post(record_response))
        .route("/guest/attempts/{attempt_id}/complete", post(complete_attempt))
        .route("/guest/attempts/{attempt_id}/abandon", post(abandon_attempt))
        .with_state(state)
}
