// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Null until the question is attached to an exam.
    pub exam_id: Option<i64>,

    /// The prompt shown to the learner.
    pub text: String,

    pub subject: Option<String>,
    pub topic: String,
    pub difficulty: String,

    /// Explanation of the correct answer.
    pub rationale: String,

    pub hint: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    /// `None` when the option is delivered to a learner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

impl QuestionWithOptions {
    pub fn has_correct_option(&self) -> bool {
        self.options.iter().any(|o| o.is_correct == Some(true))
    }
}

/// A validated question that has not been stored yet.
/// Produced by both manual creation and the file importer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub text: String,
    pub subject: Option<String>,
    pub topic: String,
    pub difficulty: String,
    pub rationale: String,
    pub hint: Option<String>,
    pub options: Vec<DraftOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOption {
    pub text: String,
    pub is_correct: bool,
}

/// DTO for creating a question by hand.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub exam_id: Option<i64>,
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 50))]
    pub difficulty: String,
    #[validate(length(min = 1, max = 5000))]
    pub rationale: String,
    pub hint: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Vec<DraftOption>,
}

impl CreateQuestionRequest {
    pub fn into_draft(self) -> (Option<i64>, QuestionDraft) {
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        (
            self.exam_id,
            QuestionDraft {
                text: self.text,
                subject: blank_to_none(self.subject),
                topic: self.topic,
                difficulty: self.difficulty,
                rationale: self.rationale,
                hint: blank_to_none(self.hint),
                options: self.options,
            },
        )
    }
}

fn validate_options(options: &[DraftOption]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    if options.iter().any(|o| o.text.trim().is_empty()) {
        return Err(validator::ValidationError::new("option_text_empty"));
    }
    if !options.iter().any(|o| o.is_correct) {
        return Err(validator::ValidationError::new("no_correct_option"));
    }
    Ok(())
}
