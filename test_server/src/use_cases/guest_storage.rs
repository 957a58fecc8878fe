use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    AttemptStatus, CategoryScore, Clock, GuestCategoryProgress, GuestResponse, GuestStorageData,
    GuestStore, GuestTestAttemptData, StorageError, StorageErrorCode, StorageKey,
};

// Scale used for category scores derived from progress totals.
const DERIVED_CATEGORY_SCALE: f64 = 100.0;

// Test identity supplied when a guest starts an attempt.
#[derive(Clone, Debug)]
pub struct StartAttempt {
    pub test_id: String,
    pub test_title: Option<String>,
    pub test_slug: Option<String>,
    pub total_questions: Option<u32>,
}

// One async lock per guest bucket. Every operation holds its guest's lock from
// the first read to the last write, so overlapping requests cannot drop updates.
#[derive(Clone, Default)]
pub struct GuestLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl GuestLocks {
    async fn acquire(&self, guest_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(guest_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    // Drops locks nobody holds or waits on.
    async fn prune(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

// Guest storage use case: guest lifecycle and attempt tracking over a bucket store.
pub struct GuestStorageUseCase<C, S> {
    pub clock: C,
    pub store: S,
    pub locks: GuestLocks,
    pub ttl_millis: u64,
}

impl<C, S> GuestStorageUseCase<C, S>
where
    C: Clock,
    S: GuestStore,
{
    // Returns the live record for `existing`, or creates a fresh guest.
    pub async fn init_guest(
        &self,
        existing: Option<&str>,
    ) -> Result<GuestStorageData, StorageError> {
        if let Some(guest_id) = existing.map(str::trim).filter(|id| !id.is_empty()) {
            let _guard = self.locks.acquire(guest_id).await;
            match self.guest(guest_id).await {
                Ok(record) => return Ok(record),
                Err(err) if err.code == StorageErrorCode::InvalidData => {
                    tracing::warn!(guest_id, error = %err, "discarding unreadable guest record");
                    self.store.clear(guest_id).await?;
                }
                Err(err) if err.code == StorageErrorCode::StorageFull => return Err(err),
                Err(err) => {
                    tracing::debug!(guest_id, error = %err, "issuing a new guest id");
                }
            }
        }

        if self.ttl_millis == 0 {
            return Err(StorageError::invalid_data("guest ttl must be positive"));
        }
        let now = self.clock.now_epoch_millis();
        let record = GuestStorageData {
            guest_id: Uuid::new_v4().to_string(),
            current_attempt_id: None,
            created_at: now,
            expires_at: now.saturating_add(self.ttl_millis),
        };
        record.validate()?;

        self.write(&record.guest_id, StorageKey::GuestId, &record).await?;
        tracing::info!(
            guest_id = %record.guest_id,
            expires_at = record.expires_at,
            "guest created"
        );
        Ok(record)
    }

    pub async fn load_guest(&self, guest_id: &str) -> Result<GuestStorageData, StorageError> {
        let _guard = self.locks.acquire(guest_id).await;
        self.guest(guest_id).await
    }

    // Loads the guest record, purging the bucket once it has expired. Callers hold
    // the guest's lock.
    async fn guest(&self, guest_id: &str) -> Result<GuestStorageData, StorageError> {
        let record: GuestStorageData = self
            .read(guest_id, StorageKey::GuestId)
            .await?
            .ok_or_else(|| StorageError::not_found("guest not found"))?;
        record.validate()?;
        if record.guest_id != guest_id {
            return Err(StorageError::invalid_data("guest record belongs to another guest"));
        }

        if record.is_expired(self.clock.now_epoch_millis()) {
            self.store.clear(guest_id).await?;
            tracing::info!(guest_id, "expired guest purged");
            return Err(StorageError::expired("guest session expired"));
        }

        Ok(record)
    }

    pub async fn start_attempt(
        &self,
        guest_id: &str,
        request: StartAttempt,
    ) -> Result<GuestTestAttemptData, StorageError> {
        if request.test_id.trim().is_empty() {
            return Err(StorageError::invalid_data("test_id is required"));
        }
        let _guard = self.locks.acquire(guest_id).await;
        let mut guest = self.guest(guest_id).await?;

        if let Some(current) = self.stored_current_attempt(&guest).await? {
            if current.is_in_progress() && current.test_id == request.test_id {
                return Ok(current);
            }
            // The attempt slot holds one attempt, so the old one is overwritten.
            if current.is_in_progress() {
                tracing::info!(
                    guest_id,
                    attempt_id = %current.attempt_id,
                    "discarding in-progress attempt replaced by a new test"
                );
            }
        }

        let attempt = GuestTestAttemptData {
            attempt_id: Uuid::new_v4().to_string(),
            test_id: request.test_id,
            test_title: request.test_title,
            test_slug: request.test_slug,
            guest_id: guest_id.to_string(),
            responses: Vec::new(),
            started_at: self.clock.now_epoch_millis(),
            status: AttemptStatus::InProgress,
            total_questions: request.total_questions,
            total_score: None,
            percentage_score: None,
            category_scores: None,
            category_progress: None,
        };

        // The attempt goes first so a full bucket leaves the pointers untouched.
        self.write(guest_id, StorageKey::GuestAttempt, &attempt).await?;
        self.store
            .set(guest_id, StorageKey::CurrentAttempt.as_str(), attempt.attempt_id.clone())
            .await?;
        guest.current_attempt_id = Some(attempt.attempt_id.clone());
        self.write(guest_id, StorageKey::GuestId, &guest).await?;

        tracing::info!(
            guest_id,
            attempt_id = %attempt.attempt_id,
            test_id = %attempt.test_id,
            "attempt started"
        );
        Ok(attempt)
    }

    pub async fn current_attempt(
        &self,
        guest_id: &str,
    ) -> Result<GuestTestAttemptData, StorageError> {
        let _guard = self.locks.acquire(guest_id).await;
        self.guest(guest_id).await?;
        let attempt_id = self
            .store
            .get(guest_id, StorageKey::CurrentAttempt.as_str())
            .await?
            .ok_or_else(|| StorageError::not_found("no attempt in progress"))?;

        let attempt = self.load_attempt(guest_id, &attempt_id).await?;
        if !attempt.is_in_progress() {
            return Err(StorageError::invalid_data("current attempt is not in progress"));
        }
        Ok(attempt)
    }

    pub async fn record_response(
        &self,
        guest_id: &str,
        attempt_id: &str,
        response: GuestResponse,
    ) -> Result<GuestTestAttemptData, StorageError> {
        response.validate()?;
        let _guard = self.locks.acquire(guest_id).await;
        self.guest(guest_id).await?;
        let mut attempt = self.load_attempt(guest_id, attempt_id).await?;
        ensure_in_progress(&attempt)?;

        attempt.upsert_response(response);
        if let Some(total) = attempt.total_questions {
            if attempt.responses.len() > total as usize {
                return Err(StorageError::invalid_data(
                    "attempt already has a response for every question",
                ));
            }
        }

        self.write(guest_id, StorageKey::GuestAttempt, &attempt).await?;
        tracing::debug!(
            guest_id,
            attempt_id,
            responses = attempt.responses.len(),
            "response recorded"
        );
        Ok(attempt)
    }

    // Finalizes the attempt. Scores from the caller win; otherwise they are derived
    // from category progress.
    pub async fn complete_attempt(
        &self,
        guest_id: &str,
        attempt_id: &str,
        category_scores: Option<Vec<CategoryScore>>,
    ) -> Result<GuestTestAttemptData, StorageError> {
        let _guard = self.locks.acquire(guest_id).await;
        let guest = self.guest(guest_id).await?;
        let mut attempt = self.load_attempt(guest_id, attempt_id).await?;
        ensure_in_progress(&attempt)?;

        let category_scores = match category_scores {
            Some(scores) if !scores.is_empty() => {
                validate_category_scores(&scores)?;
                scores
            }
            _ => derive_category_scores(attempt.category_progress.as_ref()),
        };

        let earned = attempt.points_earned();
        let max = attempt.max_points();
        attempt.total_score = Some(earned);
        attempt.percentage_score = Some(percentage(earned, max));
        attempt.category_scores = Some(category_scores);
        attempt.status = AttemptStatus::Completed;

        self.finish(guest, &attempt).await?;
        tracing::info!(
            guest_id,
            attempt_id,
            percentage_score = attempt.percentage_score,
            "attempt completed"
        );
        Ok(attempt)
    }

    pub async fn abandon_attempt(
        &self,
        guest_id: &str,
        attempt_id: &str,
    ) -> Result<GuestTestAttemptData, StorageError> {
        let _guard = self.locks.acquire(guest_id).await;
        let guest = self.guest(guest_id).await?;
        let mut attempt = self.load_attempt(guest_id, attempt_id).await?;
        ensure_in_progress(&attempt)?;

        attempt.status = AttemptStatus::Abandoned;
        self.finish(guest, &attempt).await?;
        tracing::info!(guest_id, attempt_id, "attempt abandoned");
        Ok(attempt)
    }

    pub async fn clear_guest(&self, guest_id: &str) -> Result<bool, StorageError> {
        let _guard = self.locks.acquire(guest_id).await;
        self.store.clear(guest_id).await
    }

    // Purges every bucket whose guest record is missing, unreadable or expired.
    pub async fn sweep_expired(&self) -> Result<usize, StorageError> {
        let mut purged = 0;
        for bucket in self.store.buckets().await? {
            let _guard = self.locks.acquire(&bucket).await;
            match self.guest(&bucket).await {
                Ok(_) => {}
                // guest() already cleared the bucket.
                Err(err) if err.code == StorageErrorCode::Expired => purged += 1,
                Err(err)
                    if matches!(
                        err.code,
                        StorageErrorCode::NotFound | StorageErrorCode::InvalidData
                    ) =>
                {
                    self.store.clear(&bucket).await?;
                    purged += 1;
                }
                Err(err) => return Err(err),
            }
        }
        self.locks.prune().await;
        Ok(purged)
    }

    async fn finish(
        &self,
        mut guest: GuestStorageData,
        attempt: &GuestTestAttemptData,
    ) -> Result<(), StorageError> {
        self.write(&guest.guest_id, StorageKey::GuestAttempt, attempt).await?;
        if guest.current_attempt_id.as_deref() == Some(attempt.attempt_id.as_str()) {
            self.store
                .remove(&guest.guest_id, StorageKey::CurrentAttempt.as_str())
                .await?;
            guest.current_attempt_id = None;
            self.write(&guest.guest_id, StorageKey::GuestId, &guest).await?;
        }
        Ok(())
    }

    async fn stored_current_attempt(
        &self,
        guest: &GuestStorageData,
    ) -> Result<Option<GuestTestAttemptData>, StorageError> {
        let Some(attempt_id) = guest.current_attempt_id.as_deref() else {
            return Ok(None);
        };
        match self.load_attempt(&guest.guest_id, attempt_id).await {
            Ok(attempt) => Ok(Some(attempt)),
            Err(err) if err.code == StorageErrorCode::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn load_attempt(
        &self,
        guest_id: &str,
        attempt_id: &str,
    ) -> Result<GuestTestAttemptData, StorageError> {
        let attempt: GuestTestAttemptData = self
            .read(guest_id, StorageKey::GuestAttempt)
            .await?
            .ok_or_else(|| StorageError::not_found("attempt not found"))?;
        if attempt.attempt_id != attempt_id {
            return Err(StorageError::not_found("attempt not found"));
        }
        attempt.validate()?;
        if attempt.guest_id != guest_id {
            return Err(StorageError::invalid_data("attempt belongs to another guest"));
        }
        Ok(attempt)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        bucket: &str,
        key: StorageKey,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(bucket, key.as_str()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|err| {
            StorageError::invalid_data(format!("failed to decode {}: {err}", key.as_str()))
        })
    }

    async fn write<T: Serialize + Sync>(
        &self,
        bucket: &str,
        key: StorageKey,
        value: &T,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|err| {
            StorageError::invalid_data(format!("failed to encode {}: {err}", key.as_str()))
        })?;
        self.store.set(bucket, key.as_str(), raw).await
    }
}

fn ensure_in_progress(attempt: &GuestTestAttemptData) -> Result<(), StorageError> {
    if attempt.is_in_progress() {
        Ok(())
    } else {
        Err(StorageError::invalid_data("attempt is no longer in progress"))
    }
}

fn ratio(earned: f64, max: f64) -> f64 {
    if max > 0.0 { earned / max } else { 0.0 }
}

fn percentage(earned: f64, max: f64) -> f64 {
    ratio(earned, max) * 100.0
}

fn validate_category_scores(scores: &[CategoryScore]) -> Result<(), StorageError> {
    for score in scores {
        if score.category_id.trim().is_empty() {
            return Err(StorageError::invalid_data("category_id is required"));
        }
        let values = [
            score.actual_score,
            score.max_scale,
            score.raw_score,
            score.max_raw_score,
        ];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(StorageError::invalid_data(
                "category scores must be finite and non-negative",
            ));
        }
    }
    Ok(())
}

fn derive_category_scores(progress: Option<&GuestCategoryProgress>) -> Vec<CategoryScore> {
    progress
        .into_iter()
        .flatten()
        .map(|(category_id, totals)| CategoryScore {
            category_id: category_id.clone(),
            actual_score: ratio(totals.points_earned, totals.max_points) * DERIVED_CATEGORY_SCALE,
            max_scale: DERIVED_CATEGORY_SCALE,
            raw_score: totals.points_earned,
            max_raw_score: totals.max_points,
        })
        .collect()
}
