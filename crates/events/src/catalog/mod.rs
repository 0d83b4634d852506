//! Catalog of every MedWaster event and its payload shape.
//!
//! Each payload struct is a member of the [`DomainEvent`] union and implements
//! [`EventKind`], so modules can subscribe to, or emit, one payload type
//! without matching on the whole union.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

pub mod achievement;
pub mod audit;
pub mod quiz;
pub mod streak;

pub use achievement::{
    AchievementCreated, AchievementProgress, AchievementUnlocked, AchievementViewed,
};
pub use audit::{AuditLogAccessed, AuditLogCreated, AuditLogExported, ExportFormat};
pub use quiz::{QuizAbandoned, QuizCompleted, QuizQuestionAnswered, QuizStarted};
pub use streak::{StreakMilestoneReached, StreakUpdateKind, StreakUpdated};

macro_rules! event_catalog {
    ($($variant:ident($payload:ty) => $name:literal,)+) => {
        /// Every event known to the MedWaster backend.
        ///
        /// Serialized adjacently tagged: `{"event": "quiz.completed", "data": {..}}`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "event", content = "data")]
        pub enum DomainEvent {
            $(
                #[serde(rename = $name)]
                $variant($payload),
            )+
        }

        impl DomainEvent {
            /// Routing names of all catalog members.
            pub const NAMES: &'static [&'static str] = &[$($name),+];
        }

        impl Event for DomainEvent {
            fn event_type(&self) -> &'static str {
                match self {
                    $(DomainEvent::$variant(_) => $name,)+
                }
            }

            fn occurred_at(&self) -> DateTime<Utc> {
                match self {
                    $(DomainEvent::$variant(e) => e.occurred_at,)+
                }
            }
        }

        $(
            impl EventKind<DomainEvent> for $payload {
                const NAME: &'static str = $name;

                fn project(event: &DomainEvent) -> Option<&Self> {
                    match event {
                        DomainEvent::$variant(e) => Some(e),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn into_event(self) -> DomainEvent {
                    DomainEvent::$variant(self)
                }
            }

            impl From<$payload> for DomainEvent {
                fn from(value: $payload) -> Self {
                    DomainEvent::$variant(value)
                }
            }
        )+
    };
}

event_catalog! {
    QuizStarted(QuizStarted) => "quiz.started",
    QuizCompleted(QuizCompleted) => "quiz.completed",
    QuizAbandoned(QuizAbandoned) => "quiz.abandoned",
    QuizQuestionAnswered(QuizQuestionAnswered) => "quiz.question_answered",
    AchievementUnlocked(AchievementUnlocked) => "achievement.unlocked",
    AchievementProgress(AchievementProgress) => "achievement.progress",
    AchievementViewed(AchievementViewed) => "achievement.viewed",
    AchievementCreated(AchievementCreated) => "achievement.created",
    AuditLogAccessed(AuditLogAccessed) => "audit.log_accessed",
    AuditLogExported(AuditLogExported) => "audit.log_exported",
    AuditLogCreated(AuditLogCreated) => "audit.log_created",
    StreakUpdated(StreakUpdated) => "streak.updated",
    StreakMilestoneReached(StreakMilestoneReached) => "streak.milestone_reached",
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use medwaster_core::UserId;

    use super::*;

    fn viewed() -> AchievementViewed {
        AchievementViewed {
            user_id: UserId::new("u-1").unwrap(),
            achievement_id: 3,
            is_unlocked: true,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn names_are_unique_and_match_event_kind() {
        let unique: HashSet<_> = DomainEvent::NAMES.iter().collect();
        assert_eq!(unique.len(), DomainEvent::NAMES.len());
        assert_eq!(<AchievementViewed as EventKind<DomainEvent>>::NAME, "achievement.viewed");
        assert_eq!(viewed().into_event().event_type(), "achievement.viewed");
    }

    #[test]
    fn project_only_matches_own_variant() {
        let event = DomainEvent::from(viewed());
        assert!(AchievementViewed::project(&event).is_some());
        assert!(QuizCompleted::project(&event).is_none());
    }

    #[test]
    fn serializes_with_routing_name_as_tag() {
        let event = DomainEvent::from(viewed());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "achievement.viewed");
        assert_eq!(json["data"]["achievement_id"], 3);

        let back: DomainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
