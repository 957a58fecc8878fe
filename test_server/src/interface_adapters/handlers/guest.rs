use crate::domain::{
    Clock, GuestStorageData, GuestStore, GuestTestAttemptData, StorageError, StorageErrorCode,
};
use crate::interface_adapters::protocol::{
    ClearGuestResponse, CompleteAttemptRequest, GUEST_ID_HEADER, RecordResponseRequest,
    StartAttemptRequest,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::GuestStorageUseCase;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;

type GuestResult<T> = Result<Json<T>, (StatusCode, Json<StorageError>)>;

fn guest_storage(state: &AppState) -> GuestStorageUseCase<Arc<dyn Clock>, Arc<dyn GuestStore>> {
    GuestStorageUseCase {
        clock: state.clock.clone(),
        store: state.guests.clone(),
        locks: state.guest_locks.clone(),
        ttl_millis: state.guest_ttl_millis,
    }
}

fn header_guest_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(GUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn require_guest_id(headers: &HeaderMap) -> Result<&str, (StatusCode, Json<StorageError>)> {
    header_guest_id(headers)
        .ok_or_else(|| map_storage_error(StorageError::not_found("guest id header is missing")))
}

// Maps storage errors to HTTP responses; the body keeps the tagged error shape.
fn map_storage_error(err: StorageError) -> (StatusCode, Json<StorageError>) {
    let status = match err.code {
        StorageErrorCode::NotFound => StatusCode::NOT_FOUND,
        StorageErrorCode::Expired => StatusCode::GONE,
        StorageErrorCode::InvalidData => StatusCode::BAD_REQUEST,
        StorageErrorCode::StorageFull => StatusCode::INSUFFICIENT_STORAGE,
    };
    tracing::debug!(%status, error = %err, "guest storage request failed.");
    (status, Json(err))
}

#[tracing::instrument(name = "guest_init", skip_all)]
pub async fn init_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GuestResult<GuestStorageData> {
    let record = guest_storage(&state)
        .init_guest(header_guest_id(&headers))
        .await
        .map_err(map_storage_error)?;
    Ok(Json(record))
}

#[tracing::instrument(name = "guest_get", skip_all)]
pub async fn get_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GuestResult<GuestStorageData> {
    let guest_id = require_guest_id(&headers)?;
    let record = guest_storage(&state)
        .load_guest(guest_id)
        .await
        .map_err(map_storage_error)?;
    Ok(Json(record))
}

#[tracing::instrument(name = "guest_clear", skip_all)]
pub async fn clear_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GuestResult<ClearGuestResponse> {
    let guest_id = require_guest_id(&headers)?;
    let cleared = guest_storage(&state)
        .clear_guest(guest_id)
        .await
        .map_err(map_storage_error)?;
    Ok(Json(ClearGuestResponse { cleared }))
}

#[tracing::instrument(name = "guest_start_attempt", skip_all, fields(test_id = %body.test_id))]
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<StartAttemptRequest>,
) -> GuestResult<GuestTestAttemptData> {
    let guest_id = require_guest_id(&headers)?;
    let attempt = guest_storage(&state)
        .start_attempt(guest_id, body.into())
        .await
        .map_err(map_storage_error)?;
    Ok(Json(attempt))
}

#[tracing::instrument(name = "guest_current_attempt", skip_all)]
pub async fn current_attempt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GuestResult<GuestTestAttemptData> {
    let guest_id = require_guest_id(&headers)?;
    let attempt = guest_storage(&state)
        .current_attempt(guest_id)
        .await
        .map_err(map_storage_error)?;
    Ok(Json(attempt))
}

#[tracing::instrument(name = "guest_record_response", skip_all, fields(attempt_id = %attempt_id))]
pub async fn record_response(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(attempt_id): Path<String>,
    Json(body): Json<RecordResponseRequest>,
) -> GuestResult<GuestTestAttemptData> {
    let guest_id = require_guest_id(&headers)?;
    let attempt = guest_storage(&state)
        .record_response(guest_id, &attempt_id, body.into())
        .await
        .map_err(map_storage_error)?;
    Ok(Json(attempt))
}

#[tracing::instrument(name = "guest_complete_attempt", skip_all, fields(attempt_id = %attempt_id))]
pub async fn complete_attempt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(attempt_id): Path<String>,
    Json(body): Json<CompleteAttemptRequest>,
) -> GuestResult<GuestTestAttemptData> {
    let guest_id = require_guest_id(&headers)?;
    let attempt = guest_storage(&state)
        .complete_attempt(guest_id, &attempt_id, body.category_scores)
        .await
        .map_err(map_storage_error)?;
    Ok(Json(attempt))
}

#[tracing::instrument(name = "guest_abandon_attempt", skip_all, fields(attempt_id = %attempt_id))]
pub async fn abandon_attempt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(attempt_id): Path<String>,
) -> GuestResult<GuestTestAttemptData> {
    let guest_id = require_guest_id(&headers)?;
    let attempt = guest_storage(&state)
        .abandon_attempt(guest_id, &attempt_id)
        .await
        .map_err(map_storage_error)?;
    Ok(Json(attempt))
}
