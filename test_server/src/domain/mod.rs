// Domain layer: test catalog, viewer identity and guest storage records.

pub mod catalog;
pub mod errors;
pub mod guest;
pub mod ports;

pub use catalog::{CurrentUser, PublicTest, PublicTestLookup, TestAttemptSummary};
pub use errors::{CatalogError, StorageError, StorageErrorCode, UserLookupError};
pub use guest::{
    AttemptStatus, CategoryProgress, CategoryScore, GuestCategoryProgress, GuestResponse,
    GuestStorageData, GuestTestAttemptData, StorageKey,
};
pub use ports::{Clock, GuestStore, TestCatalog, UserProvider};
