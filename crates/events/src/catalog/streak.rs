//! Learning-streak events, emitted by the gamification module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medwaster_core::UserId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakUpdateKind {
    /// First active day ever.
    Started,
    /// Active on the day after the previous active day.
    Extended,
    /// Active again after a gap; the streak starts over at 1.
    Restarted,
}

/// Event: a learner's streak changed after a new active day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakUpdated {
    pub user_id: UserId,
    pub kind: StreakUpdateKind,
    pub activity_date: NaiveDate,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_active_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a streak reached a milestone for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakMilestoneReached {
    pub user_id: UserId,
    pub milestone_days: u32,
    pub freeze_reward: u32,
    pub current_streak: u32,
    pub occurred_at: DateTime<Utc>,
}
