use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::{Clock, GuestStore, TestCatalog, UserProvider};
use crate::use_cases::GuestLocks;

#[derive(Clone)]
pub struct AppState {
    // We use Arc<dyn Trait> to hold any implementation (dependency injection).
    pub catalog: Arc<dyn TestCatalog>,
    pub users: Arc<dyn UserProvider>,
    pub guests: Arc<dyn GuestStore>,
    pub clock: Arc<dyn Clock>,
    // Shared by every request so guest operations serialize per guest.
    pub guest_locks: GuestLocks,
    // Lifetime of a guest record, in milliseconds.
    pub guest_ttl_millis: u64,
}

// System clock adapter used by the use cases.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}
