// src/services/analytics.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    config::DEFAULT_TOPIC,
    models::analytics::{AttemptSummary, DailyAttempts, Overview, TopicStat},
    services::scoring::{is_pass, percentage},
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Accuracy per topic, ordered by topic name. Answers without a topic
/// are counted under the default one.
pub fn topic_accuracy<I, S>(answers: I) -> Vec<TopicStat>
where
    I: IntoIterator<Item = (Option<S>, bool)>,
    S: AsRef<str>,
{
    let mut tally: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for (topic, is_correct) in answers {
        let topic = topic
            .as_ref()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC);
        let entry = tally.entry(topic.to_string()).or_default();
        entry.1 += 1;
        if is_correct {
            entry.0 += 1;
        }
    }

    tally
        .into_iter()
        .map(|(topic, (correct, total))| TopicStat {
            topic,
            correct,
            total,
            percentage: percentage(correct as usize, total as usize),
        })
        .collect()
}

pub fn overview(percentages: &[f64], topics: Vec<TopicStat>) -> Overview {
    let total = percentages.len();
    let passed = percentages.iter().filter(|p| is_pass(**p)).count();
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };

    Overview {
        total_attempts: total,
        average_percentage: round2(average(percentages)),
        pass_rate: round2(pass_rate),
        topics,
    }
}

pub fn attempt_summary(percentages: &[f64]) -> AttemptSummary {
    let best = percentages.iter().copied().fold(None, |acc: Option<f64>, p| {
        Some(acc.map_or(p, |a| a.max(p)))
    });
    let worst = percentages.iter().copied().fold(None, |acc: Option<f64>, p| {
        Some(acc.map_or(p, |a| a.min(p)))
    });

    AttemptSummary {
        attempts: percentages.len(),
        average_percentage: round2(average(percentages)),
        best: best.unwrap_or(0.0),
        worst: worst.unwrap_or(0.0),
    }
}

/// First UTC day of a `days`-long window ending on `today`.
pub fn series_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days - 1)
}

/// Attempts per UTC day over `days` days ending on `today`, zero-filled.
pub fn daily_series(today: NaiveDate, days: i64, timestamps: &[DateTime<Utc>]) -> Vec<DailyAttempts> {
    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for ts in timestamps {
        *counts.entry(ts.date_naive()).or_default() += 1;
    }

    let start = series_start(today, days);
    (0..days)
        .map(|offset| {
            let day = start + Duration::days(offset);
            DailyAttempts {
                date: day.format("%Y-%m-%d").to_string(),
                attempts: counts.get(&day).copied().unwrap_or(0),
            }
        })
        .collect()
}
