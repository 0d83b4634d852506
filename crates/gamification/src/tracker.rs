//! Bus-driven streak tracking.
//!
//! [`StreakTracker::register`] subscribes to `quiz.completed`. The UTC day of
//! each completion counts as an active day; changes are published as
//! `streak.updated`, first-time milestones as `streak.milestone_reached`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use medwaster_core::{DomainError, DomainResult, UserId};
use medwaster_events::catalog::{QuizCompleted, StreakMilestoneReached, StreakUpdated};
use medwaster_events::{
    DomainEvent, EventBus, EventKind, HandlerError, Subscription, WeakEventBus, emit_batch,
};

use crate::milestone::{MilestoneTable, StreakMilestone};
use crate::streak::{StreakChange, UserStreak};

#[derive(Debug, Default)]
struct Learner {
    streak: UserStreak,
    achieved: BTreeSet<u32>,
}

/// What one recorded activity did to a learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakOutcome {
    pub change: StreakChange,
    pub streak: UserStreak,
    /// Milestones reached for the first time by this activity.
    pub milestones: Vec<StreakMilestone>,
}

/// In-memory streak state for all learners.
#[derive(Debug, Default)]
pub struct StreakTracker {
    milestones: MilestoneTable,
    learners: Mutex<HashMap<UserId, Learner>>,
}

impl StreakTracker {
    pub fn new(milestones: MilestoneTable) -> Self {
        Self {
            milestones,
            learners: Mutex::new(HashMap::new()),
        }
    }

    fn learners(&self) -> MutexGuard<'_, HashMap<UserId, Learner>> {
        self.learners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn milestones(&self) -> &MilestoneTable {
        &self.milestones
    }

    pub fn streak(&self, user: &UserId) -> Option<UserStreak> {
        self.learners().get(user).map(|learner| learner.streak.clone())
    }

    /// Count `date` as active for `user`, awarding freezes for new milestones.
    pub fn record_activity(&self, user: &UserId, date: NaiveDate) -> StreakOutcome {
        let mut learners = self.learners();
        let learner = learners.entry(user.clone()).or_default();

        let change = learner.streak.record_activity(date);
        let mut reached = Vec::new();
        if change != StreakChange::AlreadyCounted {
            reached.extend(
                self.milestones
                    .newly_reached(learner.streak.current_streak, &learner.achieved)
                    .copied(),
            );
            for milestone in &reached {
                learner.achieved.insert(milestone.days);
                learner.streak.award_freezes(milestone.freeze_reward);
            }
        }

        StreakOutcome {
            change,
            streak: learner.streak.clone(),
            milestones: reached,
        }
    }

    pub fn use_freeze(&self, user: &UserId, date: NaiveDate) -> DomainResult<UserStreak> {
        let mut learners = self.learners();
        let learner = learners.get_mut(user).ok_or_else(DomainError::not_found)?;
        learner.streak.use_freeze(date)?;
        Ok(learner.streak.clone())
    }

    /// Break every streak that lapsed by `today`. Returns the affected learners.
    pub fn break_lapsed_streaks(&self, today: NaiveDate) -> Vec<UserId> {
        let mut broken = Vec::new();
        for (user, learner) in self.learners().iter_mut() {
            if learner.streak.is_broken(today) {
                learner.streak.break_streak();
                broken.push(user.clone());
            }
        }
        if !broken.is_empty() {
            info!(count = broken.len(), %today, "broke lapsed streaks");
        }
        broken
    }

    /// Subscribe to `quiz.completed` on `bus`.
    ///
    /// The tracker keeps only a weak handle to the bus for its follow-up
    /// emissions, so registration does not keep the bus alive.
    pub fn register(self: &Arc<Self>, bus: &EventBus<DomainEvent>) -> Subscription<DomainEvent> {
        let tracker = Arc::clone(self);
        let weak = bus.downgrade();
        bus.on("gamification.streak-tracker", move |completed: QuizCompleted| {
            let tracker = Arc::clone(&tracker);
            let weak = weak.clone();
            async move { tracker.on_quiz_completed(completed, weak).await }
        })
    }

    async fn on_quiz_completed(
        &self,
        completed: QuizCompleted,
        bus: WeakEventBus<DomainEvent>,
    ) -> Result<(), HandlerError> {
        let date = completed.occurred_at.date_naive();
        let outcome = self.record_activity(&completed.user_id, date);
        let Some(kind) = outcome.change.update_kind() else {
            debug!(user = %completed.user_id, %date, "activity already counted");
            return Ok(());
        };
        let Some(bus) = bus.upgrade() else {
            return Ok(());
        };

        let now = Utc::now();
        let mut follow_ups = vec![
            StreakUpdated {
                user_id: completed.user_id.clone(),
                kind,
                activity_date: date,
                current_streak: outcome.streak.current_streak,
                longest_streak: outcome.streak.longest_streak,
                total_active_days: outcome.streak.total_active_days,
                occurred_at: now,
            }
            .into_event(),
        ];
        for milestone in &outcome.milestones {
            info!(user = %completed.user_id, days = milestone.days, "streak milestone reached");
            follow_ups.push(
                StreakMilestoneReached {
                    user_id: completed.user_id.clone(),
                    milestone_days: milestone.days,
                    freeze_reward: milestone.freeze_reward,
                    current_streak: outcome.streak.current_streak,
                    occurred_at: now,
                }
                .into_event(),
            );
        }

        emit_batch(&bus, follow_ups).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn completed(user_id: &str, at: DateTime<Utc>) -> DomainEvent {
        QuizCompleted {
            user_id: user(user_id),
            quiz_id: 1,
            quiz_name: "Sharps disposal".to_owned(),
            score: 8,
            max_score: 10,
            percentage_score: 80.0,
            questions_answered: 10,
            total_questions: 10,
            correct_answers: 8,
            time_spent_secs: 240,
            is_perfect: false,
            occurred_at: at,
        }
        .into_event()
    }

    fn at_day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn milestones_award_freezes_once() {
        let tracker = StreakTracker::default();
        let alice = user("alice");
        for d in 1..=6 {
            tracker.record_activity(&alice, day(d));
        }
        let outcome = tracker.record_activity(&alice, day(7));
        assert_eq!(outcome.milestones.iter().map(|m| m.days).collect::<Vec<_>>(), vec![7]);
        assert_eq!(outcome.streak.freezes_available, 1);

        // Restarting and reaching 3 again awards nothing new.
        tracker.record_activity(&alice, day(20));
        tracker.record_activity(&alice, day(21));
        let outcome = tracker.record_activity(&alice, day(22));
        assert!(outcome.milestones.is_empty());
    }

    #[test]
    fn break_lapsed_streaks_respects_freezes() {
        let tracker = StreakTracker::default();
        let (alice, bob) = (user("alice"), user("bob"));
        tracker.record_activity(&alice, day(1));
        tracker.record_activity(&bob, day(1));
        {
            let mut learners = tracker.learners();
            learners.get_mut(&bob).unwrap().streak.award_freezes(1);
        }
        tracker.use_freeze(&bob, day(2)).unwrap();

        assert_eq!(tracker.break_lapsed_streaks(day(3)), vec![alice.clone()]);
        assert_eq!(tracker.streak(&alice).unwrap().current_streak, 0);
        assert_eq!(tracker.streak(&bob).unwrap().current_streak, 1);
    }

    #[test]
    fn use_freeze_for_unknown_learner_is_not_found() {
        let tracker = StreakTracker::default();
        assert_eq!(tracker.use_freeze(&user("ghost"), day(1)), Err(DomainError::NotFound));
    }

    #[tokio::test]
    async fn quiz_completions_publish_streak_events() {
        let bus = EventBus::<DomainEvent>::new();
        let tracker = Arc::new(StreakTracker::default());
        let _sub = tracker.register(&bus);

        let updates = Arc::new(Mutex::new(Vec::new()));
        let reached = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        bus.on("test.updates", move |event: StreakUpdated| {
            sink.lock().unwrap().push((event.kind, event.current_streak));
            async { Ok(()) }
        });
        let sink = Arc::clone(&reached);
        bus.on("test.milestones", move |event: StreakMilestoneReached| {
            sink.lock().unwrap().push(event.milestone_days);
            async { Ok(()) }
        });

        for d in 1..=3 {
            bus.emit(completed("alice", at_day(d))).await.unwrap();
        }
        // Same day again: no update.
        bus.emit(completed("alice", at_day(3))).await.unwrap();

        use medwaster_events::catalog::StreakUpdateKind::{Extended, Started};
        assert_eq!(
            *updates.lock().unwrap(),
            vec![(Started, 1), (Extended, 2), (Extended, 3)]
        );
        assert_eq!(*reached.lock().unwrap(), vec![3]);
        assert_eq!(tracker.streak(&user("alice")).unwrap().total_active_days, 3);
    }

    #[tokio::test]
    async fn tracker_does_not_keep_bus_alive() {
        let bus = EventBus::<DomainEvent>::new();
        let tracker = Arc::new(StreakTracker::default());
        let sub = tracker.register(&bus);
        assert!(sub.is_active());

        drop(bus);
        assert!(!sub.is_active());
        assert_eq!(Arc::strong_count(&tracker), 1);
    }
}
