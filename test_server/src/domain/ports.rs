use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::catalog::{CurrentUser, PublicTestLookup};
use crate::domain::errors::{CatalogError, StorageError, UserLookupError};

// Port for the public test catalog (the page's data source).
#[async_trait]
pub trait TestCatalog: Send + Sync {
    // Looks up a public test by slug together with the viewer's attempts.
    async fn get_public_test(
        &self,
        slug: &str,
        viewer: Option<&CurrentUser>,
    ) -> Result<PublicTestLookup, CatalogError>;
}

// Port for resolving the viewer behind a session token.
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>, UserLookupError>;
}

// Port for per-guest key/value buckets holding serialized records.
#[async_trait]
pub trait GuestStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, bucket: &str, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;
    async fn clear(&self, bucket: &str) -> Result<bool, StorageError>;
    async fn buckets(&self) -> Result<Vec<String>, StorageError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

// Shared handles held in application state satisfy the ports directly.

#[async_trait]
impl<T: TestCatalog + ?Sized> TestCatalog for Arc<T> {
    async fn get_public_test(
        &self,
        slug: &str,
        viewer: Option<&CurrentUser>,
    ) -> Result<PublicTestLookup, CatalogError> {
        (**self).get_public_test(slug, viewer).await
    }
}

#[async_trait]
impl<T: UserProvider + ?Sized> UserProvider for Arc<T> {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>, UserLookupError> {
        (**self).current_user(token).await
    }
}

#[async_trait]
impl<T: GuestStore + ?Sized> GuestStore for Arc<T> {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(bucket, key).await
    }

    async fn set(&self, bucket: &str, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(bucket, key, value).await
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        (**self).remove(bucket, key).await
    }

    async fn clear(&self, bucket: &str) -> Result<bool, StorageError> {
        (**self).clear(bucket).await
    }

    async fn buckets(&self) -> Result<Vec<String>, StorageError> {
        (**self).buckets().await
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_epoch_millis(&self) -> u64 {
        (**self).now_epoch_millis()
    }
}
