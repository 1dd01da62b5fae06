// src/handlers/exam.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    config::Config,
    error::AppError,
    models::{
        exam_session::{ExamResult, ExamSession, StartExamResponse, SubmitExamRequest},
        question::{PublicQuestion, Question},
    },
    utils::jwt::Claims,
};

/// Query parameters for starting an exam.
#[derive(Debug, Deserialize)]
pub struct StartExamParams {
    pub limit: Option<i64>,
}

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    correct: String,
}

/// Helper function to score a submission against the answer key.
///
/// Option tags are compared case-insensitively. Submitted ids that are
/// absent from the key contribute nothing.
fn score_answers(user_answers: &HashMap<i64, String>, answer_key: &HashMap<i64, String>) -> i64 {
    let mut score = 0;
    for (q_id, choice) in user_answers {
        if let Some(correct) = answer_key.get(q_id) {
            if choice.eq_ignore_ascii_case(correct) {
                score += 1;
            }
        }
    }
    score
}

async fn bank_size(pool: &SqlitePool) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Starts a new exam session for the authenticated user.
///
/// * Draws `min(limit, bank size)` random questions, without replacement.
/// * Creates one session row (`submitted = false`, `score = 0`).
/// * Returns the questions with the answer key stripped.
pub async fn start_exam(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<StartExamParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10);

    // SQLite treats a negative LIMIT as "no limit"; reject before it leaks.
    if limit <= 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, text, option_a, option_b, option_c, option_d, correct
        FROM questions
        ORDER BY RANDOM()
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "No questions available. Seed the question bank first.".to_string(),
        ));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        INSERT INTO exam_sessions (user_id, started_at, duration_seconds)
        VALUES (?, ?, ?)
        RETURNING id, user_id, started_at, duration_seconds, submitted, score
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(config.exam_duration_seconds)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam session: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let questions: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(StartExamResponse {
        session_id: session.id,
        questions,
    }))
}

/// Submits a user's exam answers and grades them.
///
/// * The session must exist and belong to the caller; a session owned by
///   someone else looks exactly like a missing one (404).
/// * A session already submitted returns its stored score untouched; the
///   payload is ignored and no new answer rows appear.
/// * Submitted ids with no matching question are skipped without error.
/// * Overdue submissions are still graded.
/// * Session update and answer inserts commit in one transaction.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    let total = bank_size(&pool).await?;

    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        SELECT id, user_id, started_at, duration_seconds, submitted, score
        FROM exam_sessions
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(req.session_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Session not found".to_string()))?;

    if session.submitted {
        // Idempotent response; nothing is re-graded.
        return Ok(Json(ExamResult {
            session_id: session.id,
            score: session.score,
            total,
        }));
    }

    let elapsed = Utc::now()
        .signed_duration_since(session.started_at)
        .num_seconds();
    if elapsed > session.duration_seconds {
        tracing::warn!(
            "Session {} submitted {}s over its {}s budget; grading anyway",
            session.id,
            elapsed - session.duration_seconds,
            session.duration_seconds
        );
    }

    let question_ids: Vec<i64> = req.answers.keys().copied().collect();

    let answer_key: HashMap<i64, String> = if question_ids.is_empty() {
        HashMap::new()
    } else {
        // Dynamic IN clause to fetch the answer key for the submitted ids
        let mut query_builder =
            sqlx::QueryBuilder::<Sqlite>::new("SELECT id, correct FROM questions WHERE id IN (");

        let mut separated = query_builder.separated(",");
        for id in &question_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let keys: Vec<AnswerKey> = query_builder
            .build_query_as()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        keys.into_iter().map(|k| (k.id, k.correct)).collect()
    };

    let score = score_answers(&req.answers, &answer_key);

    for (q_id, choice) in &req.answers {
        // Unknown question id: no row, no error.
        if !answer_key.contains_key(q_id) {
            continue;
        }

        sqlx::query("INSERT INTO answers (session_id, question_id, choice) VALUES (?, ?, ?)")
            .bind(session.id)
            .bind(q_id)
            .bind(choice.to_lowercase())
            .execute(&mut *tx)
            .await?;
    }

    // Conditional write: only the first submit may flip the flag. Losing the
    // race rolls the transaction (and our answer rows) back.
    let updated = sqlx::query(
        "UPDATE exam_sessions SET score = ?, submitted = 1 WHERE id = ? AND submitted = 0",
    )
    .bind(score)
    .bind(session.id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        drop(tx);

        let stored: i64 = sqlx::query_scalar("SELECT score FROM exam_sessions WHERE id = ?")
            .bind(session.id)
            .fetch_one(&pool)
            .await?;

        return Ok(Json(ExamResult {
            session_id: session.id,
            score: stored,
            total,
        }));
    }

    tx.commit().await?;

    Ok(Json(ExamResult {
        session_id: session.id,
        score,
        total,
    }))
}

/// Retrieves the result of a session.
///
/// Pure read; safe to call any number of times. Before submission the
/// score reads as zero.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        SELECT id, user_id, started_at, duration_seconds, submitted, score
        FROM exam_sessions
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Session not found".to_string()))?;

    let total = bank_size(&pool).await?;

    Ok(Json(ExamResult {
        session_id: session.id,
        score: session.score,
        total,
    }))
}
