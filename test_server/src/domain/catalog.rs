use serde::{Deserialize, Serialize};

use crate::domain::guest::AttemptStatus;

// A test that may be shown on the public test page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicTest {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub question_count: u32,
    pub duration_minutes: Option<u32>,
}

// One past or ongoing attempt of the viewer at a public test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestAttemptSummary {
    pub id: String,
    pub status: AttemptStatus,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub percentage_score: Option<f64>,
}

// Result of a catalog lookup by slug. `test` is None when nothing public matches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublicTestLookup {
    pub test: Option<PublicTest>,
    pub attempts: Vec<TestAttemptSummary>,
}

// Authenticated viewer as reported by the auth service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: u64,
    pub display_name: String,
}
