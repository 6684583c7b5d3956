// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::QuestionWithOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    Practice,
    Exam,
}

impl ExamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamMode::Practice => "practice",
            ExamMode::Exam => "exam",
        }
    }
}

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Time allowed, in minutes.
    pub duration: i32,
    /// 'practice' or 'exam'.
    pub mode: String,
    pub created_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Exam listing entry with its question count.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub exam: Exam,
    pub question_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration: i32,
    pub mode: Option<ExamMode>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration: Option<i32>,
    pub mode: Option<ExamMode>,
}

/// Query parameters for exam delivery.
#[derive(Debug, Deserialize)]
pub struct DeliveryParams {
    pub limit: Option<i64>,
    /// Anything but "0" shuffles.
    pub shuffle: Option<String>,
}

impl DeliveryParams {
    pub fn shuffle(&self) -> bool {
        self.shuffle.as_deref() != Some("0")
    }
}

/// An exam as sent to the person taking it.
#[derive(Debug, Serialize)]
pub struct ExamDelivery {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<QuestionWithOptions>,
}
