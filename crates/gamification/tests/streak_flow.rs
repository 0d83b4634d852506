//! Streak tracking driven through a shared bus, as the application wires it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use medwaster_core::UserId;
use medwaster_events::catalog::{QuizCompleted, StreakMilestoneReached, StreakUpdated};
use medwaster_events::{DomainEvent, EventBus, EventKind, log_events};
use medwaster_gamification::{MilestoneTable, StreakMilestone, StreakTracker};
use medwaster_observability::{LogFormat, ObservabilityConfig};

fn init_tracing() {
    let config = ObservabilityConfig::default()
        .with_format(LogFormat::Compact)
        .with_default_filter("debug");
    medwaster_observability::tracing::init_with(&config);
}

fn completion(user: &str, at: DateTime<Utc>) -> DomainEvent {
    QuizCompleted {
        user_id: UserId::new(user).unwrap(),
        quiz_id: 7,
        quiz_name: "Chemical waste".to_owned(),
        score: 10,
        max_score: 10,
        percentage_score: 100.0,
        questions_answered: 5,
        total_questions: 5,
        correct_answers: 5,
        time_spent_secs: 90,
        is_perfect: true,
        occurred_at: at,
    }
    .into_event()
}

fn on_day(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap()
}

#[tokio::test]
async fn learners_are_tracked_independently() {
    init_tracing();
    let bus = EventBus::<DomainEvent>::new();
    let _logger = log_events(&bus, StreakUpdated::NAME);
    let table = MilestoneTable::new([StreakMilestone { days: 2, freeze_reward: 1 }]).unwrap();
    let tracker = Arc::new(StreakTracker::new(table));
    let _sub = tracker.register(&bus);

    let milestones = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&milestones);
    bus.on("test.milestones", move |event: StreakMilestoneReached| {
        sink.lock()
            .unwrap()
            .push((event.user_id.to_string(), event.milestone_days, event.freeze_reward));
        async { Ok(()) }
    });

    bus.emit(completion("ana", on_day(1, 8))).await.unwrap();
    bus.emit(completion("ana", on_day(1, 23))).await.unwrap();
    bus.emit(completion("ben", on_day(1, 9))).await.unwrap();
    bus.emit(completion("ana", on_day(2, 7))).await.unwrap();
    bus.emit(completion("ben", on_day(4, 9))).await.unwrap();

    let ana = tracker.streak(&UserId::new("ana").unwrap()).unwrap();
    let ben = tracker.streak(&UserId::new("ben").unwrap()).unwrap();
    assert_eq!((ana.current_streak, ana.freezes_available), (2, 1));
    assert_eq!((ben.current_streak, ben.longest_streak), (1, 1));
    assert_eq!(*milestones.lock().unwrap(), vec![("ana".to_owned(), 2, 1)]);
}

#[tokio::test]
async fn freeze_keeps_streak_through_daily_check() {
    init_tracing();
    let bus = EventBus::<DomainEvent>::new();
    let tracker = Arc::new(StreakTracker::default());
    let _sub = tracker.register(&bus);
    let ana = UserId::new("ana").unwrap();

    for day in 1..=7 {
        bus.emit(completion("ana", on_day(day, 12))).await.unwrap();
    }
    // Day 7 is a default milestone worth one freeze.
    let streak = tracker.use_freeze(&ana, on_day(8, 0).date_naive()).unwrap();
    assert_eq!(streak.freezes_available, 0);

    assert!(tracker.break_lapsed_streaks(on_day(9, 0).date_naive()).is_empty());
    bus.emit(completion("ana", on_day(9, 12))).await.unwrap();
    assert_eq!(tracker.streak(&ana).unwrap().current_streak, 8);

    assert_eq!(tracker.break_lapsed_streaks(on_day(12, 0).date_naive()), vec![ana.clone()]);
    assert_eq!(tracker.streak(&ana).unwrap().current_streak, 0);
}
