use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

/// One workout instance owned by a user. Status moves in_progress -> completed
/// exactly once; the row is never hard-deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WorkoutSession {
    pub id: i64,
    pub user_id: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WorkoutSession {
    pub fn is_in_progress(&self) -> bool {
        self.status == STATUS_IN_PROGRESS
    }
}

/// One movement within a session, ordered by `order_index` (unique per session).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SessionExercise {
    pub id: i64,
    pub session_id: i64,
    pub name: String,
    pub is_bodyweight: bool,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

/// One numbered attempt within an exercise. Set numbers form a contiguous
/// 1..N run per exercise; a bodyweight exercise's sets never carry a weight.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SessionSet {
    pub id: i64,
    pub session_exercise_id: i64,
    pub set_number: i64,
    pub target_reps: Option<i64>,
    pub target_weight: Option<f64>,
    pub memo: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for SessionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reps = self
            .target_reps
            .map(|r| format!("{} reps", r))
            .unwrap_or_else(|| "- reps".to_string());
        let weight = self
            .target_weight
            .map(|w| format!(" x {:.1}kg", w))
            .unwrap_or_default();
        write!(f, "Set {}: {}{}", self.set_number, reps, weight)
    }
}
