// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'results' table in the database.
/// One row per submission attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    /// Number of correct answers.
    pub score: i32,
    pub percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub exam_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_option_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: i64,
    pub score: i32,
    pub percentage: f64,
    pub pass: bool,
}

/// Entry in the caller's own result history.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyResult {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub question_count: i64,
    pub score: i32,
    pub percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One recorded answer, joined with what the learner saw.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,
    pub is_correct: bool,
    /// `None` when the question no longer exists.
    pub question_text: Option<String>,
    pub topic: Option<String>,
    pub rationale: Option<String>,
    pub selected_option_text: Option<String>,
    pub correct_option_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetail {
    #[serde(flatten)]
    pub result: ExamResult,
    pub exam_title: String,
    pub pass: bool,
    pub answers: Vec<AnswerDetail>,
}

/// Recent-activity row for the admin dashboard.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentResult {
    pub id: i64,
    pub user_email: String,
    pub user_name: String,
    pub exam_id: i64,
    pub exam_title: String,
    pub score: i32,
    pub percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Row read for the CSV export.
#[derive(Debug, FromRow)]
pub struct ExportRow {
    pub user_email: String,
    pub exam_title: String,
    pub score: i32,
    pub percentage: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub exam_id: Option<i64>,
}
