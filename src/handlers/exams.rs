// src/handlers/exams.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, DeliveryParams, Exam, ExamDelivery, ExamMode, ExamSummary, UpdateExamRequest},
        question::{Question, QuestionOption, QuestionWithOptions},
    },
    services::delivery,
    utils::{
        extract::{AppPath, AppQuery},
        json::AppJson,
        jwt::Claims,
    },
};

/// Loads an exam row or fails with 404.
pub async fn fetch_exam(pool: &PgPool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        "SELECT id, title, description, duration, mode, created_by, created_at FROM exams WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

/// Loads every question of an exam with its options, in id order.
pub async fn fetch_exam_questions(
    pool: &PgPool,
    exam_id: i64,
) -> Result<Vec<QuestionWithOptions>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, text, subject, topic, difficulty, rationale, hint, created_at
        FROM questions
        WHERE exam_id = $1
        ORDER BY id
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.text, o.is_correct
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.exam_id = $1
        ORDER BY o.id
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    Ok(attach_options(questions, options))
}

/// Groups option rows under their questions, keeping question order.
pub fn attach_options(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }
    questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect()
}

/// Creates an exam.
/// Admin only.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mode = payload.mode.unwrap_or(ExamMode::Exam);
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (title, description, duration, mode, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, description, duration, mode, created_by, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration)
    .bind(mode.as_str())
    .bind(claims.user_id()?)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(exam_id = exam.id, "Exam created");
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Lists exams with their question counts, newest first.
pub async fn list_exams(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT
            e.id, e.title, e.description, e.duration, e.mode, e.created_by, e.created_at,
            (SELECT COUNT(*) FROM questions q WHERE q.exam_id = e.id) AS question_count
        FROM exams e
        ORDER BY e.created_at DESC, e.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(exams))
}

/// Delivers an exam for taking.
///
/// * Drops questions that cannot be scored.
/// * Shuffles questions and options unless `shuffle=0`.
/// * Keeps at most `limit` questions.
/// * Hides correctness flags from students.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<DeliveryParams>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;
    let questions = delivery::sanitize(fetch_exam_questions(&pool, id).await?);

    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "This exam has no valid questions. Ensure each question has options and a correct answer."
                .to_string(),
        ));
    }

    let mut questions =
        delivery::arrange(questions, params.shuffle(), params.limit, &mut rand::thread_rng());
    if !claims.is_admin() {
        delivery::hide_answers(&mut questions);
    }

    Ok(Json(ExamDelivery { exam, questions }))
}

/// Updates an exam by ID. Fields are optional.
/// Admin only.
pub async fn update_exam(
    State(pool): State<PgPool>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.title.is_none()
        && payload.description.is_none()
        && payload.duration.is_none()
        && payload.mode.is_none()
    {
        return Ok(Json(fetch_exam(&pool, id).await?));
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(duration) = payload.duration {
        separated.push("duration = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(mode) = payload.mode {
        separated.push("mode = ");
        separated.push_bind_unseparated(mode.as_str());
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING id, title, description, duration, mode, created_by, created_at");

    let exam = builder
        .build_query_as::<Exam>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update exam: {:?}", e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam))
}

/// Deletes an exam with its questions, options and results, plus every
/// answer that references one of its questions.
/// Admin only.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    // answers.question_id has no foreign key, so answers recorded under other
    // exams' results are removed explicitly. Options cascade from questions.
    let answers = sqlx::query(
        "DELETE FROM answers WHERE question_id IN (SELECT id FROM questions WHERE exam_id = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    let results = sqlx::query("DELETE FROM results WHERE exam_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let questions = sqlx::query("DELETE FROM questions WHERE exam_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam: {:?}", e);
            AppError::from(e)
        })?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    tx.commit().await?;
    tracing::info!(exam_id = id, answers, results, questions, "Exam deleted");

    Ok(Json(serde_json::json!({ "ok": true })))
}
