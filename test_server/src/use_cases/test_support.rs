use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::domain::{
    CatalogError, Clock, CurrentUser, GuestStore, PublicTest, PublicTestLookup, StorageError,
    TestAttemptSummary, TestCatalog, UserLookupError, UserProvider,
};

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0
    }
}

pub(crate) fn sample_test(slug: &str, description: Option<&str>) -> PublicTest {
    PublicTest {
        id: format!("test-{slug}"),
        slug: slug.to_string(),
        title: "Logic 101".to_string(),
        description: description.map(str::to_string),
        question_count: 12,
        duration_minutes: Some(20),
    }
}

#[derive(Clone, Default)]
pub(crate) struct StubCatalog {
    tests: HashMap<String, PublicTest>,
    attempts: HashMap<u64, Vec<TestAttemptSummary>>,
    fail: bool,
    last_viewer: Arc<Mutex<Option<CurrentUser>>>,
}

impl StubCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_test(mut self, test: PublicTest) -> Self {
        self.tests.insert(test.slug.clone(), test);
        self
    }

    pub(crate) fn with_attempts(mut self, user_id: u64, attempts: Vec<TestAttemptSummary>) -> Self {
        self.attempts.insert(user_id, attempts);
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn last_viewer(&self) -> Option<CurrentUser> {
        self.last_viewer
            .lock()
            .expect("viewer mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl TestCatalog for StubCatalog {
    async fn get_public_test(
        &self,
        slug: &str,
        viewer: Option<&CurrentUser>,
    ) -> Result<PublicTestLookup, CatalogError> {
        *self.last_viewer.lock().expect("viewer mutex poisoned") = viewer.cloned();
        if self.fail {
            return Err(CatalogError::Unavailable("connection refused".to_string()));
        }

        let attempts = viewer
            .and_then(|user| self.attempts.get(&user.user_id))
            .cloned()
            .unwrap_or_default();
        Ok(PublicTestLookup {
            test: self.tests.get(slug).cloned(),
            attempts,
        })
    }
}

#[derive(Clone)]
pub(crate) struct StubUsers {
    user: Option<CurrentUser>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StubUsers {
    pub(crate) fn guest() -> Self {
        Self {
            user: None,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: Some(user),
            ..Self::guest()
        }
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserProvider for StubUsers {
    async fn current_user(&self, _token: &str) -> Result<Option<CurrentUser>, UserLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(UserLookupError::Unavailable("auth timed out".to_string()));
        }
        Ok(self.user.clone())
    }
}

pub(crate) type BucketTable = Arc<Mutex<HashMap<String, HashMap<String, String>>>>;

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get: bool,
    pub set: bool,
}

// Guest store fake that lets tests inspect and corrupt raw bucket contents.
#[derive(Clone)]
pub(crate) struct RecordingStore {
    buckets: BucketTable,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_raw(&self, bucket: &str, key: &str, value: &str) {
        let mut guard = self.buckets.lock().expect("buckets mutex poisoned");
        guard
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub(crate) fn raw(&self, bucket: &str, key: &str) -> Option<String> {
        let guard = self.buckets.lock().expect("buckets mutex poisoned");
        guard.get(bucket).and_then(|entries| entries.get(key)).cloned()
    }

    pub(crate) fn has_bucket(&self, bucket: &str) -> bool {
        let guard = self.buckets.lock().expect("buckets mutex poisoned");
        guard.contains_key(bucket)
    }
}

#[async_trait]
impl GuestStore for RecordingStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        if self.failures.get {
            return Err(StorageError::invalid_data("get failed"));
        }
        Ok(self.raw(bucket, key))
    }

    async fn set(&self, bucket: &str, key: &str, value: String) -> Result<(), StorageError> {
        if self.failures.set {
            return Err(StorageError::storage_full("quota exceeded"));
        }
        self.insert_raw(bucket, key, &value);
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let mut guard = self.buckets.lock().expect("buckets mutex poisoned");
        Ok(guard
            .get_mut(bucket)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    async fn clear(&self, bucket: &str) -> Result<bool, StorageError> {
        let mut guard = self.buckets.lock().expect("buckets mutex poisoned");
        Ok(guard.remove(bucket).is_some())
    }

    async fn buckets(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.buckets.lock().expect("buckets mutex poisoned");
        Ok(guard.keys().cloned().collect())
    }
}

// Counts error-level events emitted while installed on the current thread.
#[derive(Clone, Default)]
pub(crate) struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub(crate) fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
