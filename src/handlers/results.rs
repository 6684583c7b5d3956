// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::{NaiveTime, SecondsFormat, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    config::SERIES_DAYS,
    error::AppError,
    handlers::exams::fetch_exam,
    models::{
        analytics::{Attempt, TopExam, UserAnalytics},
        result::{
            AnswerDetail, ExamResult, ExportParams, ExportRow, MyResult, RecentResult, ResultDetail,
            SubmitRequest, SubmitResponse,
        },
        user::StudentSummary,
    },
    services::{
        analytics,
        scoring::{self, AnswerKey, OptionFlag},
    },
    utils::{
        extract::{AppPath, AppQuery},
        json::AppJson,
        jwt::Claims,
    },
};

/// Scores a submission and stores it as a new result.
///
/// Every call creates a new result. Answers to questions outside the exam
/// are stored and graded incorrect.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(question_id) = scoring::duplicate_question(&payload.answers) {
        return Err(AppError::BadRequest(format!(
            "Question {} is answered more than once",
            question_id
        )));
    }

    let user_id = claims.user_id()?;
    fetch_exam(&pool, payload.exam_id).await?;

    let mut tx = pool.begin().await?;

    let total_questions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
            .bind(payload.exam_id)
            .fetch_one(&mut *tx)
            .await?;

    let options = sqlx::query_as::<_, OptionFlag>(
        r#"
        SELECT o.question_id, o.id AS option_id, o.is_correct
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.exam_id = $1
        ORDER BY o.id
        "#,
    )
    .bind(payload.exam_id)
    .fetch_all(&mut *tx)
    .await?;

    let key = AnswerKey::new(total_questions as usize, options);
    let grade = key.grade(&payload.answers);

    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results (user_id, exam_id, score, percentage)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(payload.exam_id)
    .bind(grade.score)
    .bind(grade.percentage)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store result: {:?}", e);
        AppError::from(e)
    })?;

    if !grade.answers.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO answers (result_id, question_id, selected_option_id, is_correct) ",
        );
        builder.push_values(&grade.answers, |mut b, answer| {
            b.push_bind(result_id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_option_id)
                .push_bind(answer.is_correct);
        });
        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to store answers: {:?}", e);
            AppError::from(e)
        })?;
    }

    tx.commit().await?;

    tracing::info!(
        result_id,
        user_id,
        exam_id = payload.exam_id,
        score = grade.score,
        percentage = grade.percentage,
        "Submission scored"
    );

    Ok(Json(SubmitResponse {
        id: result_id,
        score: grade.score,
        percentage: grade.percentage,
        pass: grade.pass,
    }))
}

/// The caller's results, newest first.
pub async fn my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, MyResult>(
        r#"
        SELECT
            r.id, r.exam_id, e.title AS exam_title,
            (SELECT COUNT(*) FROM questions q WHERE q.exam_id = r.exam_id) AS question_count,
            r.score, r.percentage, r.created_at
        FROM results r
        JOIN exams e ON e.id = r.exam_id
        WHERE r.user_id = $1
        ORDER BY r.created_at DESC, r.id DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(results))
}

/// One of the caller's results with every recorded answer.
pub async fn result_detail(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT id, user_id, exam_id, score, percentage, created_at
        FROM results
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(claims.user_id()?)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;

    let exam = fetch_exam(&pool, result.exam_id).await?;

    let answers = sqlx::query_as::<_, AnswerDetail>(
        r#"
        SELECT
            a.id, a.question_id, a.selected_option_id, a.is_correct,
            q.text AS question_text, q.topic, q.rationale,
            so.text AS selected_option_text,
            (SELECT co.text FROM options co
             WHERE co.question_id = a.question_id AND co.is_correct
             ORDER BY co.id LIMIT 1) AS correct_option_text
        FROM answers a
        LEFT JOIN questions q ON q.id = a.question_id
        LEFT JOIN options so ON so.id = a.selected_option_id AND so.question_id = a.question_id
        WHERE a.result_id = $1
        ORDER BY a.id
        "#,
    )
    .bind(result.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ResultDetail {
        pass: scoring::is_pass(result.percentage),
        result,
        exam_title: exam.title,
        answers,
    }))
}

/// Attempts, average, pass rate and topic accuracy.
/// Global for admins, personal for students.
pub async fn analytics_overview(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scope = if claims.is_admin() {
        None
    } else {
        Some(claims.user_id()?)
    };

    let percentages: Vec<f64> = sqlx::query_scalar(
        "SELECT percentage FROM results WHERE $1::BIGINT IS NULL OR user_id = $1",
    )
    .bind(scope)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load analytics: {:?}", e);
        AppError::from(e)
    })?;

    let topic_rows: Vec<(Option<String>, bool)> = sqlx::query_as(
        r#"
        SELECT q.topic, a.is_correct
        FROM answers a
        JOIN results r ON r.id = a.result_id
        JOIN questions q ON q.id = a.question_id
        WHERE $1::BIGINT IS NULL OR r.user_id = $1
        "#,
    )
    .bind(scope)
    .fetch_all(&pool)
    .await?;

    let topics = analytics::topic_accuracy(topic_rows);
    Ok(Json(analytics::overview(&percentages, topics)))
}

/// Students with their result counts, ordered by email.
/// Admin only.
pub async fn analytics_students(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let students = sqlx::query_as::<_, StudentSummary>(
        r#"
        SELECT u.id, u.email, u.name, COUNT(r.id) AS result_count
        FROM users u
        LEFT JOIN results r ON r.user_id = u.id
        WHERE u.role = 'student'
        GROUP BY u.id, u.email, u.name
        ORDER BY u.email
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

/// Attempt history, topic breakdown and summary for one user.
/// Admin only.
pub async fn analytics_user(
    State(pool): State<PgPool>,
    AppPath(user_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT r.id, r.created_at AS date, e.title AS exam, r.percentage
        FROM results r
        JOIN exams e ON e.id = r.exam_id
        WHERE r.user_id = $1
        ORDER BY r.created_at ASC, r.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let topic_rows: Vec<(Option<String>, bool)> = sqlx::query_as(
        r#"
        SELECT q.topic, a.is_correct
        FROM answers a
        JOIN results r ON r.id = a.result_id
        LEFT JOIN questions q ON q.id = a.question_id
        WHERE r.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let percentages: Vec<f64> = attempts.iter().map(|a| a.percentage).collect();

    Ok(Json(UserAnalytics {
        summary: analytics::attempt_summary(&percentages),
        topics: analytics::topic_accuracy(topic_rows),
        attempts,
    }))
}

/// Attempts per UTC day over the last two weeks.
/// Admin only.
pub async fn admin_series(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let since = analytics::series_start(today, SERIES_DAYS)
        .and_time(NaiveTime::MIN)
        .and_utc();

    let timestamps: Vec<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT created_at FROM results WHERE created_at >= $1")
            .bind(since)
            .fetch_all(&pool)
            .await?;

    Ok(Json(analytics::daily_series(today, SERIES_DAYS, &timestamps)))
}

/// Exams with the most attempts.
/// Admin only.
pub async fn top_exams(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, TopExam>(
        r#"
        SELECT e.id AS exam_id, e.title, COUNT(r.id) AS attempts
        FROM results r
        JOIN exams e ON e.id = r.exam_id
        GROUP BY e.id, e.title
        ORDER BY attempts DESC, e.id
        LIMIT 5
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Latest results across all users.
/// Admin only.
pub async fn recent_results(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, RecentResult>(
        r#"
        SELECT
            r.id, u.email AS user_email, u.name AS user_name,
            r.exam_id, e.title AS exam_title,
            r.score, r.percentage, r.created_at
        FROM results r
        JOIN users u ON u.id = r.user_id
        JOIN exams e ON e.id = r.exam_id
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Renders export rows as CSV, header first.
pub fn export_rows_to_csv(rows: &[ExportRow]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let to_internal = |e: csv::Error| AppError::InternalServerError(e.to_string());

    writer
        .write_record(["user", "exam", "score", "percentage", "createdAt"])
        .map_err(to_internal)?;
    for row in rows {
        writer
            .write_record([
                row.user_email.clone(),
                row.exam_title.clone(),
                row.score.to_string(),
                row.percentage.to_string(),
                row.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ])
            .map_err(to_internal)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Downloads results as CSV, optionally for one exam.
/// Admin only.
pub async fn export_csv(
    State(pool): State<PgPool>,
    AppQuery(params): AppQuery<ExportParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ExportRow>(
        r#"
        SELECT u.email AS user_email, e.title AS exam_title, r.score, r.percentage, r.created_at
        FROM results r
        JOIN users u ON u.id = r.user_id
        JOIN exams e ON e.id = r.exam_id
        WHERE $1::BIGINT IS NULL OR r.exam_id = $1
        ORDER BY r.created_at DESC, r.id DESC
        "#,
    )
    .bind(params.exam_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to export results: {:?}", e);
        AppError::from(e)
    })?;

    let body = export_rows_to_csv(&rows)?;
    tracing::info!(rows = rows.len(), exam_id = ?params.exam_id, "Results exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"results.csv\""),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn export_quotes_fields_that_need_it() {
        let rows = vec![ExportRow {
            user_email: "ada@example.com".into(),
            exam_title: "Rust, basics".into(),
            score: 2,
            percentage: 66.67,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }];

        let csv = export_rows_to_csv(&rows).unwrap();
        assert_eq!(
            csv,
            "user,exam,score,percentage,createdAt\n\
             ada@example.com,\"Rust, basics\",2,66.67,2024-03-01T09:30:00.000Z\n"
        );
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(
            export_rows_to_csv(&[]).unwrap(),
            "user,exam,score,percentage,createdAt\n"
        );
    }
}
