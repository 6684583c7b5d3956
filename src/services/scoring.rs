// src/services/scoring.rs

use std::collections::{HashMap, HashSet};

use crate::{config::PASSING_PERCENTAGE, models::result::SubmittedAnswer};

/// One option of an exam question, as far as grading cares.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct OptionFlag {
    pub question_id: i64,
    pub option_id: i64,
    pub is_correct: bool,
}

/// The correct option of every scoreable question in one exam.
///
/// Built per submission from freshly loaded rows; exam content may change
/// between requests, so a key is never reused.
#[derive(Debug, Default)]
pub struct AnswerKey {
    correct: HashMap<i64, i64>,
    total_questions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option_id: i64,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub answers: Vec<GradedAnswer>,
    pub score: i32,
    pub percentage: f64,
    pub pass: bool,
}

impl AnswerKey {
    /// `options` should arrive ordered by option id: when a question has
    /// several correct options the first one is the key.
    /// Questions without a correct option stay out of the key.
    pub fn new(total_questions: usize, options: impl IntoIterator<Item = OptionFlag>) -> Self {
        let mut correct = HashMap::new();
        for option in options.into_iter().filter(|o| o.is_correct) {
            correct.entry(option.question_id).or_insert(option.option_id);
        }
        Self {
            correct,
            total_questions,
        }
    }

    pub fn correct_option(&self, question_id: i64) -> Option<i64> {
        self.correct.get(&question_id).copied()
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    /// Grades a submission. Foreign or unscoreable question ids are graded
    /// incorrect; unanswered questions simply lower the percentage.
    pub fn grade(&self, answers: &[SubmittedAnswer]) -> Grade {
        let answers: Vec<GradedAnswer> = answers
            .iter()
            .map(|a| GradedAnswer {
                question_id: a.question_id,
                selected_option_id: a.selected_option_id,
                is_correct: self.correct_option(a.question_id) == Some(a.selected_option_id),
            })
            .collect();

        let correct_count = answers.iter().filter(|a| a.is_correct).count();
        let percentage = percentage(correct_count, self.total_questions);

        Grade {
            answers,
            score: correct_count as i32,
            percentage,
            pass: is_pass(percentage),
        }
    }
}

/// `correct / total` as a percentage with two decimals.
///
/// Scales by 10000, rounds, then divides by 100, in that order.
/// A zero total yields 0.
pub fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((correct as f64 / total as f64) * 10000.0).round() / 100.0
}

pub fn is_pass(percentage: f64) -> bool {
    percentage >= PASSING_PERCENTAGE
}

/// Returns the first question id that appears more than once.
pub fn duplicate_question(answers: &[SubmittedAnswer]) -> Option<i64> {
    let mut seen = HashSet::with_capacity(answers.len());
    answers
        .iter()
        .map(|a| a.question_id)
        .find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(question_id: i64, option_id: i64, is_correct: bool) -> OptionFlag {
        OptionFlag {
            question_id,
            option_id,
            is_correct,
        }
    }

    fn answer(question_id: i64, selected_option_id: i64) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selected_option_id,
        }
    }

    /// Three questions (1, 2, 3) whose correct options are 11, 22 and 33.
    fn three_question_key() -> AnswerKey {
        AnswerKey::new(
            3,
            vec![
                flag(1, 10, false),
                flag(1, 11, true),
                flag(2, 20, false),
                flag(2, 22, true),
                flag(3, 33, true),
                flag(3, 34, false),
            ],
        )
    }

    #[test]
    fn all_correct_scores_full_marks_and_passes() {
        let grade = three_question_key().grade(&[answer(1, 11), answer(2, 22), answer(3, 33)]);
        assert_eq!(grade.score, 3);
        assert_eq!(grade.percentage, 100.0);
        assert!(grade.pass);
        assert!(grade.answers.iter().all(|a| a.is_correct));
    }

    #[test]
    fn all_wrong_scores_zero() {
        let grade = three_question_key().grade(&[answer(1, 10), answer(2, 20), answer(3, 34)]);
        assert_eq!(grade.score, 0);
        assert_eq!(grade.percentage, 0.0);
        assert!(!grade.pass);
    }

    #[test]
    fn exam_without_questions_scores_zero() {
        let grade = AnswerKey::new(0, vec![]).grade(&[answer(1, 11)]);
        assert_eq!(grade.score, 0);
        assert_eq!(grade.percentage, 0.0);
        assert!(!grade.pass);
    }

    #[test]
    fn one_of_three_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 8), 12.5);
    }

    #[test]
    fn unanswered_questions_count_against_the_total() {
        let grade = three_question_key().grade(&[answer(1, 11)]);
        assert_eq!(grade.score, 1);
        assert_eq!(grade.percentage, 33.33);
        assert_eq!(grade.answers.len(), 1);
    }

    #[test]
    fn foreign_question_ids_are_recorded_as_incorrect() {
        let grade = three_question_key().grade(&[answer(99, 11), answer(2, 22)]);
        assert_eq!(grade.score, 1);
        assert_eq!(
            grade.answers[0],
            GradedAnswer {
                question_id: 99,
                selected_option_id: 11,
                is_correct: false
            }
        );
    }

    #[test]
    fn question_without_correct_option_can_never_score() {
        let key = AnswerKey::new(2, vec![flag(1, 10, false), flag(1, 11, false), flag(2, 20, true)]);
        assert_eq!(key.correct_option(1), None);
        let grade = key.grade(&[answer(1, 10), answer(1, 11), answer(2, 20)]);
        assert_eq!(grade.score, 1);
    }

    #[test]
    fn first_correct_option_wins_when_several_are_flagged() {
        let key = AnswerKey::new(1, vec![flag(1, 5, true), flag(1, 6, true)]);
        assert_eq!(key.correct_option(1), Some(5));
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(is_pass(70.0));
        assert!(!is_pass(69.99));
        // 7 of 10 sits exactly on the threshold.
        assert!(is_pass(percentage(7, 10)));
    }

    #[test]
    fn duplicate_question_ids_are_detected() {
        assert_eq!(duplicate_question(&[answer(1, 1), answer(2, 2)]), None);
        assert_eq!(duplicate_question(&[answer(1, 1), answer(2, 2), answer(1, 3)]), Some(1));
        assert_eq!(duplicate_question(&[]), None);
    }
}
