use serde::{Deserialize, Serialize};

use crate::domain::{CategoryScore, GuestResponse};
use crate::use_cases::StartAttempt;

// Header carrying the guest id issued by `/guest/init`.
pub const GUEST_ID_HEADER: &str = "x-guest-id";

// Request payload for starting a guest attempt.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub test_id: String,
    pub test_title: Option<String>,
    pub test_slug: Option<String>,
    pub total_questions: Option<u32>,
}

impl From<StartAttemptRequest> for StartAttempt {
    fn from(body: StartAttemptRequest) -> Self {
        StartAttempt {
            test_id: body.test_id,
            test_title: body.test_title,
            test_slug: body.test_slug,
            total_questions: body.total_questions,
        }
    }
}

// Request payload for answering one question.
#[derive(Debug, Deserialize)]
pub struct RecordResponseRequest {
    pub question_id: String,
    pub selected_option_id: String,
    pub points_earned: f64,
    pub max_points: f64,
    pub category_id: Option<String>,
}

impl From<RecordResponseRequest> for GuestResponse {
    fn from(body: RecordResponseRequest) -> Self {
        GuestResponse {
            question_id: body.question_id,
            selected_option_id: body.selected_option_id,
            points_earned: body.points_earned,
            max_points: body.max_points,
            category_id: body.category_id,
        }
    }
}

// Request payload for completing an attempt; scores come from the scoring engine.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteAttemptRequest {
    #[serde(default)]
    pub category_scores: Option<Vec<CategoryScore>>,
}

// Response payload for clearing a guest.
#[derive(Debug, Serialize)]
pub struct ClearGuestResponse {
    pub cleared: bool,
}
