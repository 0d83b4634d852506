//! Quiz interaction events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medwaster_core::UserId;

/// Event: a learner opened a quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizStarted {
    pub user_id: UserId,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub total_questions: u32,
    pub time_limit_secs: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a learner submitted a quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCompleted {
    pub user_id: UserId,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub score: u32,
    pub max_score: u32,
    pub percentage_score: f64,
    pub questions_answered: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_spent_secs: u32,
    pub is_perfect: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an attempt was left unfinished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAbandoned {
    pub user_id: UserId,
    pub quiz_id: i64,
    pub questions_answered: u32,
    pub total_questions: u32,
    pub time_spent_secs: u32,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestionAnswered {
    pub user_id: UserId,
    pub quiz_id: i64,
    pub question_id: i64,
    pub is_correct: bool,
    pub time_spent_secs: u32,
    /// 1-based attempt number for this question.
    pub attempt: u32,
    pub occurred_at: DateTime<Utc>,
}
