//! Achievement events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medwaster_core::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlocked {
    pub user_id: UserId,
    pub achievement_id: i64,
    pub achievement_name: String,
    pub category: String,
    pub difficulty: String,
    pub progress: u32,
    pub progress_max: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementProgress {
    pub user_id: UserId,
    pub achievement_id: i64,
    pub achievement_name: String,
    pub progress: u32,
    pub progress_max: u32,
    pub percent_complete: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementViewed {
    pub user_id: UserId,
    pub achievement_id: i64,
    pub is_unlocked: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an administrator defined a new achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementCreated {
    pub achievement_id: i64,
    pub achievement_name: String,
    pub category: String,
    pub trigger_type: String,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}
