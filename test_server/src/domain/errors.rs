use serde::{Deserialize, Serialize};
use std::fmt;

// Failure of the test catalog backing the public test page.
#[derive(Debug)]
pub enum CatalogError {
    Unavailable(String),
    InvalidRecord(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Unavailable(reason) => write!(f, "catalog unavailable: {reason}"),
            CatalogError::InvalidRecord(reason) => write!(f, "invalid catalog record: {reason}"),
        }
    }
}

impl std::error::Error for CatalogError {}

// Failure of the current-user lookup. Invalid or expired tokens are not errors,
// they resolve to "no user".
#[derive(Debug)]
pub enum UserLookupError {
    Unavailable(String),
}

impl fmt::Display for UserLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserLookupError::Unavailable(reason) => write!(f, "user lookup unavailable: {reason}"),
        }
    }
}

impl std::error::Error for UserLookupError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageErrorCode {
    StorageFull,
    InvalidData,
    Expired,
    NotFound,
}

impl StorageErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageErrorCode::StorageFull => "STORAGE_FULL",
            StorageErrorCode::InvalidData => "INVALID_DATA",
            StorageErrorCode::Expired => "EXPIRED",
            StorageErrorCode::NotFound => "NOT_FOUND",
        }
    }
}

// Tagged guest storage failure, serialized as `{"message": .., "code": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageError {
    pub message: String,
    pub code: StorageErrorCode,
}

impl StorageError {
    pub fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn storage_full(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::StorageFull, message)
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::InvalidData, message)
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::Expired, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::NotFound, message)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StorageError {}
