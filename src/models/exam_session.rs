// src/models/exam_session.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::PublicQuestion;

/// Represents the 'exam_sessions' table in the database.
///
/// One row per exam attempt. `score` is a placeholder (zero) until
/// `submitted` flips to true, which happens at most once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub user_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_seconds: i64,
    pub submitted: bool,
    pub score: i64,
}

/// Represents the 'answers' table. Append-only; rows are written during a
/// single submit and never touched again.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    /// The selected option tag, stored lower-cased.
    pub choice: String,
}

/// DTO for returning a freshly started exam.
#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub session_id: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub session_id: i64,

    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: User's selected option tag ('a'..'d', any case)
    pub answers: std::collections::HashMap<i64, String>,
}

/// DTO shared by submit and result retrieval.
///
/// `total` is the size of the whole question bank, not the number of
/// answers graded.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamResult {
    pub session_id: i64,
    pub score: i64,
    pub total: i64,
}
