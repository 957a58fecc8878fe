use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::StorageError;

// Fixed keys under which a guest's records are stored in their bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKey {
    GuestId,
    GuestAttempt,
    CurrentAttempt,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::GuestId => "guest_id",
            StorageKey::GuestAttempt => "guest_attempt",
            StorageKey::CurrentAttempt => "current_attempt",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    pub fn label(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "In progress",
            AttemptStatus::Completed => "Completed",
            AttemptStatus::Abandoned => "Abandoned",
        }
    }
}

// Identity record of an anonymous visitor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuestStorageData {
    pub guest_id: String,
    pub current_attempt_id: Option<String>,
    pub created_at: u64,
    pub expires_at: u64,
}

impl GuestStorageData {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.guest_id.trim().is_empty() {
            return Err(StorageError::invalid_data("guest record has no guest_id"));
        }
        if self.expires_at <= self.created_at {
            return Err(StorageError::invalid_data(
                "guest record expires before it was created",
            ));
        }
        Ok(())
    }
}

// One answered question inside a guest attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuestResponse {
    pub question_id: String,
    pub selected_option_id: String,
    pub points_earned: f64,
    pub max_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl GuestResponse {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.question_id.trim().is_empty() {
            return Err(StorageError::invalid_data("question_id is required"));
        }
        if self.selected_option_id.trim().is_empty() {
            return Err(StorageError::invalid_data("selected_option_id is required"));
        }
        if !self.points_earned.is_finite() || !self.max_points.is_finite() {
            return Err(StorageError::invalid_data("points must be finite"));
        }
        if self.points_earned < 0.0 || self.max_points < 0.0 {
            return Err(StorageError::invalid_data("points must not be negative"));
        }
        if self.points_earned > self.max_points {
            return Err(StorageError::invalid_data(
                "points_earned must not exceed max_points",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: String,
    pub actual_score: f64,
    pub max_scale: f64,
    pub raw_score: f64,
    pub max_raw_score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub answered: u32,
    pub points_earned: f64,
    pub max_points: f64,
}

// Running totals per category id.
pub type GuestCategoryProgress = BTreeMap<String, CategoryProgress>;

// One attempt at one test by one guest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuestTestAttemptData {
    pub attempt_id: String,
    pub test_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_slug: Option<String>,
    pub guest_id: String,
    pub responses: Vec<GuestResponse>,
    pub started_at: u64,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_scores: Option<Vec<CategoryScore>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_progress: Option<GuestCategoryProgress>,
}

impl GuestTestAttemptData {
    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub fn has_aggregates(&self) -> bool {
        self.total_score.is_some()
            || self.percentage_score.is_some()
            || self.category_scores.is_some()
    }

    // Checks the invariants a loaded record must hold.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.attempt_id.trim().is_empty() || self.test_id.trim().is_empty() {
            return Err(StorageError::invalid_data("attempt record is missing ids"));
        }
        match self.status {
            AttemptStatus::Completed => {
                if self.total_score.is_none()
                    || self.percentage_score.is_none()
                    || self.category_scores.is_none()
                {
                    return Err(StorageError::invalid_data(
                        "completed attempt is missing its scores",
                    ));
                }
            }
            AttemptStatus::InProgress | AttemptStatus::Abandoned => {
                if self.has_aggregates() {
                    return Err(StorageError::invalid_data(
                        "only completed attempts carry scores",
                    ));
                }
            }
        }
        self.responses.iter().try_for_each(GuestResponse::validate)
    }

    // Appends a response, or replaces the earlier answer to the same question so
    // the list never shrinks.
    pub fn upsert_response(&mut self, response: GuestResponse) {
        match self
            .responses
            .iter_mut()
            .find(|existing| existing.question_id == response.question_id)
        {
            Some(existing) => *existing = response,
            None => self.responses.push(response),
        }
        self.category_progress = category_progress(&self.responses);
    }

    pub fn points_earned(&self) -> f64 {
        self.responses.iter().map(|r| r.points_earned).sum()
    }

    pub fn max_points(&self) -> f64 {
        self.responses.iter().map(|r| r.max_points).sum()
    }
}

fn category_progress(responses: &[GuestResponse]) -> Option<GuestCategoryProgress> {
    let mut progress = GuestCategoryProgress::new();
    for response in responses {
        let Some(category_id) = &response.category_id else {
            continue;
        };
        let entry = progress.entry(category_id.clone()).or_default();
        entry.answered += 1;
        entry.points_earned += response.points_earned;
        entry.max_points += response.max_points;
    }
    if progress.is_empty() {
        None
    } else {
        Some(progress)
    }
}
