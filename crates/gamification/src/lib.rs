//! Gamification module: learning streaks.
//!
//! Streak rules are deterministic calendar arithmetic (no IO). The
//! [`StreakTracker`] wires them to the event bus: every `quiz.completed`
//! counts as an active day, and streak changes are published back as
//! `streak.updated` / `streak.milestone_reached`.

pub mod milestone;
pub mod streak;
pub mod tracker;

pub use milestone::{MilestoneTable, StreakMilestone};
pub use streak::{StreakChange, UserStreak};
pub use tracker::{StreakOutcome, StreakTracker};
