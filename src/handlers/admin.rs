// src/handlers/admin.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::PgPool;

use crate::{error::AppError, utils::jwt::Claims};

/// Row counts removed by a reset.
#[derive(Debug, Serialize)]
pub struct ResetReport {
    pub answers: u64,
    pub results: u64,
    pub options: u64,
    pub questions: u64,
    pub exams: u64,
    pub users: u64,
}

/// Wipes all exam content, attempts and every other account.
/// The calling admin is kept so the session stays usable.
/// Admin only.
pub async fn reset(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.user_id()?;
    let mut tx = pool.begin().await?;

    // Children before parents.
    let tables = ["answers", "results", "options", "questions", "exams"];
    let mut counts = [0u64; 5];
    for (table, count) in tables.iter().zip(counts.iter_mut()) {
        *count = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Reset failed on {}: {:?}", table, e);
                AppError::from(e)
            })?
            .rows_affected();
    }
    let [answers, results, options, questions, exams] = counts;

    let users = sqlx::query("DELETE FROM users WHERE id <> $1")
        .bind(caller)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    let report = ResetReport {
        answers,
        results,
        options,
        questions,
        exams,
        users,
    };
    tracing::warn!(admin_id = caller, ?report, "Database reset");

    Ok(Json(report))
}
