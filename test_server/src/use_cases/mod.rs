// Use cases layer: application workflows for the test pages and guest storage.

pub mod guest_storage;
pub mod test_page;

#[cfg(test)]
pub(crate) mod test_support;

pub use guest_storage::{GuestLocks, GuestStorageUseCase, StartAttempt};
pub use test_page::{PageError, PageMetadata, TestPage, TestPageUseCase};
