// src/models/analytics.rs

use serde::Serialize;

/// Accuracy for one topic across a set of answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStat {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_attempts: usize,
    pub average_percentage: f64,
    pub pass_rate: f64,
    pub topics: Vec<TopicStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempts: usize,
    pub average_percentage: f64,
    pub best: f64,
    pub worst: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Attempt {
    pub id: i64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub exam: String,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct UserAnalytics {
    pub attempts: Vec<Attempt>,
    pub topics: Vec<TopicStat>,
    pub summary: AttemptSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAttempts {
    pub date: String,
    pub attempts: u32,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopExam {
    pub exam_id: i64,
    pub title: String,
    pub attempts: i64,
}
