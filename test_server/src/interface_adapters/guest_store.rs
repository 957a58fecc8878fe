use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{GuestStore, StorageError};

type Bucket = HashMap<String, String>;

// In-memory guest store with a byte quota per bucket, mirroring browser storage limits.
#[derive(Clone)]
pub struct InMemoryGuestStore {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    quota_bytes: usize,
}

impl InMemoryGuestStore {
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            quota_bytes,
        }
    }
}

fn bucket_size(bucket: &Bucket) -> usize {
    bucket.iter().map(|(key, value)| key.len() + value.len()).sum()
}

#[async_trait]
impl GuestStore for InMemoryGuestStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        let buckets = self.buckets.lock().await;
        Ok(buckets
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn set(&self, bucket: &str, key: &str, value: String) -> Result<(), StorageError> {
        let mut buckets = self.buckets.lock().await;
        let entries = buckets.get(bucket);

        // Size after the write, with any previous value under this key replaced.
        let current = entries.map(bucket_size).unwrap_or(0);
        let replaced = entries
            .and_then(|entries| entries.get(key))
            .map(|old| key.len() + old.len())
            .unwrap_or(0);
        let projected = current - replaced + key.len() + value.len();
        if projected > self.quota_bytes {
            tracing::warn!(
                bucket,
                key,
                projected,
                quota = self.quota_bytes,
                "guest bucket is full"
            );
            return Err(StorageError::storage_full(format!(
                "writing {key} would exceed the {} byte guest quota",
                self.quota_bytes
            )));
        }

        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.lock().await;
        let Some(entries) = buckets.get_mut(bucket) else {
            return Ok(false);
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            buckets.remove(bucket);
        }
        Ok(removed)
    }

    async fn clear(&self, bucket: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.lock().await;
        Ok(buckets.remove(bucket).is_some())
    }

    async fn buckets(&self) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.lock().await;
        Ok(buckets.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StorageErrorCode;

    #[tokio::test]
    async fn when_value_is_set_then_it_can_be_read_back() {
        let store = InMemoryGuestStore::new(1024);

        store
            .set("guest-1", "guest_id", "{}".to_string())
            .await
            .expect("expected write");

        let value = store.get("guest-1", "guest_id").await.expect("expected read");
        assert_eq!(value.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn when_write_exceeds_quota_then_storage_full_and_old_value_is_kept() {
        let store = InMemoryGuestStore::new(32);
        store
            .set("guest-1", "guest_attempt", "small".to_string())
            .await
            .expect("expected write");

        let err = store
            .set("guest-1", "guest_attempt", "x".repeat(64))
            .await
            .expect_err("expected quota error");

        assert_eq!(err.code, StorageErrorCode::StorageFull);
        let value = store.get("guest-1", "guest_attempt").await.expect("read");
        assert_eq!(value.as_deref(), Some("small"));
    }

    #[tokio::test]
    async fn when_value_is_replaced_then_old_size_does_not_count_against_quota() {
        // "guest_attempt" is 13 bytes, so each 10 byte value totals 23.
        let store = InMemoryGuestStore::new(24);
        store
            .set("guest-1", "guest_attempt", "a".repeat(10))
            .await
            .expect("expected write");

        store
            .set("guest-1", "guest_attempt", "b".repeat(10))
            .await
            .expect("expected replacement within quota");
    }

    #[tokio::test]
    async fn when_quota_is_per_bucket_then_other_guests_are_unaffected() {
        let store = InMemoryGuestStore::new(20);
        store
            .set("guest-1", "guest_id", "a".repeat(10))
            .await
            .expect("expected write");

        store
            .set("guest-2", "guest_id", "b".repeat(10))
            .await
            .expect("expected write in separate bucket");
    }

    #[tokio::test]
    async fn when_last_key_is_removed_then_bucket_disappears() {
        let store = InMemoryGuestStore::new(1024);
        store
            .set("guest-1", "current_attempt", "attempt-1".to_string())
            .await
            .expect("expected write");

        assert!(store.remove("guest-1", "current_attempt").await.expect("remove"));
        assert!(!store.remove("guest-1", "current_attempt").await.expect("remove"));
        assert!(store.buckets().await.expect("buckets").is_empty());
    }

    #[tokio::test]
    async fn when_bucket_is_cleared_then_all_keys_are_gone() {
        let store = InMemoryGuestStore::new(1024);
        store
            .set("guest-1", "guest_id", "{}".to_string())
            .await
            .expect("expected write");
        store
            .set("guest-1", "current_attempt", "attempt-1".to_string())
            .await
            .expect("expected write");

        assert!(store.clear("guest-1").await.expect("clear"));
        assert_eq!(store.get("guest-1", "guest_id").await.expect("read"), None);
        assert!(!store.clear("guest-1").await.expect("clear"));
    }
}
