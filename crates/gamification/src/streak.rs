//! Per-learner streak state.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use medwaster_core::{DomainError, DomainResult};
use medwaster_events::catalog::StreakUpdateKind;

/// Result of recording one active day.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreakChange {
    /// The day was already counted (same day, or older than the last active day).
    AlreadyCounted,
    Started,
    Extended,
    Restarted,
}

impl StreakChange {
    /// The published form of this change; `None` when nothing changed.
    pub fn update_kind(self) -> Option<StreakUpdateKind> {
        match self {
            StreakChange::AlreadyCounted => None,
            StreakChange::Started => Some(StreakUpdateKind::Started),
            StreakChange::Extended => Some(StreakUpdateKind::Extended),
            StreakChange::Restarted => Some(StreakUpdateKind::Restarted),
        }
    }
}

/// Streak state of one learner.
///
/// Days are calendar dates; callers decide which time zone a day belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStreak {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_active_days: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub current_streak_start: Option<NaiveDate>,
    pub freezes_available: u32,
    pub freezes_used: u32,
    /// Missed days covered by a freeze.
    pub frozen_days: BTreeSet<NaiveDate>,
}

impl UserStreak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every day strictly between `from` and `to` is frozen.
    fn gap_covered(&self, from: NaiveDate, to: NaiveDate) -> bool {
        from.iter_days()
            .skip(1)
            .take_while(|day| *day < to)
            .all(|day| self.frozen_days.contains(&day))
    }

    /// Count `date` as an active day.
    pub fn record_activity(&mut self, date: NaiveDate) -> StreakChange {
        let change = match self.last_activity_date {
            None => StreakChange::Started,
            Some(last) if date <= last => return StreakChange::AlreadyCounted,
            Some(last) if self.current_streak > 0 && self.gap_covered(last, date) => {
                StreakChange::Extended
            }
            Some(_) => StreakChange::Restarted,
        };

        if change == StreakChange::Extended {
            self.current_streak += 1;
        } else {
            self.current_streak = 1;
            self.current_streak_start = Some(date);
        }
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.total_active_days += 1;
        self.last_activity_date = Some(date);
        change
    }

    pub fn can_use_freeze(&self) -> bool {
        self.freezes_available > 0
    }

    /// Spend a freeze to cover a missed `date`.
    pub fn use_freeze(&mut self, date: NaiveDate) -> DomainResult<()> {
        if !self.can_use_freeze() {
            return Err(DomainError::validation("no freezes available"));
        }
        if self.last_activity_date.is_some_and(|last| date <= last) {
            return Err(DomainError::validation(
                "cannot freeze a day at or before the last active day",
            ));
        }
        if !self.frozen_days.insert(date) {
            return Err(DomainError::conflict(format!("{date} is already frozen")));
        }
        self.freezes_available -= 1;
        self.freezes_used += 1;
        Ok(())
    }

    pub fn award_freezes(&mut self, count: u32) {
        self.freezes_available = self.freezes_available.saturating_add(count);
    }

    /// Whether an active streak has lapsed by `today`: some full day between the
    /// last active day and `today` was neither active nor frozen.
    pub fn is_broken(&self, today: NaiveDate) -> bool {
        if self.current_streak == 0 {
            return false;
        }
        match self.last_activity_date {
            Some(last) => (today - last).num_days() >= 2 && !self.gap_covered(last, today),
            None => false,
        }
    }

    pub fn break_streak(&mut self) {
        self.current_streak = 0;
        self.current_streak_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn first_activity_starts_streak() {
        let mut s = UserStreak::new();
        assert_eq!(s.record_activity(day(1)), StreakChange::Started);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.current_streak_start, Some(day(1)));
        assert_eq!(s.total_active_days, 1);
    }

    #[test]
    fn consecutive_days_extend_and_same_day_is_ignored() {
        let mut s = UserStreak::new();
        s.record_activity(day(1));
        assert_eq!(s.record_activity(day(2)), StreakChange::Extended);
        assert_eq!(s.record_activity(day(2)), StreakChange::AlreadyCounted);
        assert_eq!(s.record_activity(day(3)), StreakChange::Extended);

        assert_eq!(s.current_streak, 3);
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.total_active_days, 3);
        assert_eq!(s.current_streak_start, Some(day(1)));
    }

    #[test]
    fn gap_restarts_but_keeps_longest() {
        let mut s = UserStreak::new();
        s.record_activity(day(1));
        s.record_activity(day(2));
        assert_eq!(s.record_activity(day(5)), StreakChange::Restarted);

        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 2);
        assert_eq!(s.current_streak_start, Some(day(5)));
    }

    #[test]
    fn late_activity_does_not_rewind() {
        let mut s = UserStreak::new();
        s.record_activity(day(10));
        assert_eq!(s.record_activity(day(9)), StreakChange::AlreadyCounted);
        assert_eq!(s.last_activity_date, Some(day(10)));
    }

    #[test]
    fn freeze_bridges_a_missed_day() {
        let mut s = UserStreak::new();
        s.award_freezes(1);
        s.record_activity(day(1));
        s.use_freeze(day(2)).unwrap();

        assert!(!s.is_broken(day(3)));
        assert_eq!(s.record_activity(day(3)), StreakChange::Extended);
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.freezes_available, 0);
        assert_eq!(s.freezes_used, 1);
    }

    #[test]
    fn use_freeze_requires_available_freeze() {
        let mut s = UserStreak::new();
        let err = s.use_freeze(day(2)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn freezing_same_day_twice_conflicts() {
        let mut s = UserStreak::new();
        s.award_freezes(2);
        s.use_freeze(day(2)).unwrap();
        assert!(matches!(s.use_freeze(day(2)), Err(DomainError::Conflict(_))));
        assert_eq!(s.freezes_available, 1);
    }

    #[test]
    fn streak_breaks_after_a_full_missed_day() {
        let mut s = UserStreak::new();
        s.record_activity(day(1));
        assert!(!s.is_broken(day(2)));
        assert!(s.is_broken(day(3)));

        s.break_streak();
        assert_eq!(s.current_streak, 0);
        assert!(!s.is_broken(day(4)));
        assert_eq!(s.record_activity(day(4)), StreakChange::Restarted);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: N consecutive days give a streak of N.
            #[test]
            fn consecutive_days_accumulate(len in 1u32..60) {
                let mut s = UserStreak::new();
                let start = day(1);
                for offset in 0..len {
                    s.record_activity(start + chrono::Days::new(u64::from(offset)));
                }
                prop_assert_eq!(s.current_streak, len);
                prop_assert_eq!(s.longest_streak, len);
            }

            /// Property: longest >= current and active days == distinct days recorded.
            #[test]
            fn counters_stay_consistent(offsets in proptest::collection::vec(0u64..90, 1..40)) {
                let mut s = UserStreak::new();
                let mut sorted = offsets.clone();
                sorted.sort_unstable();
                for offset in &sorted {
                    s.record_activity(day(1) + chrono::Days::new(*offset));
                    prop_assert!(s.longest_streak >= s.current_streak);
                }
                sorted.dedup();
                prop_assert_eq!(s.total_active_days as usize, sorted.len());
            }
        }
    }
}
