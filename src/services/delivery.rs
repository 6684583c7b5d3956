// src/services/delivery.rs

use rand::{Rng, seq::SliceRandom};

use crate::models::question::QuestionWithOptions;

/// Drops options with blank text, then questions left without options or
/// without a correct option. What remains can always be scored.
pub fn sanitize(questions: Vec<QuestionWithOptions>) -> Vec<QuestionWithOptions> {
    questions
        .into_iter()
        .map(|mut q| {
            q.options.retain(|o| !o.text.trim().is_empty());
            q
        })
        .filter(|q| !q.options.is_empty() && q.has_correct_option())
        .collect()
}

/// Shuffles questions (and each question's options) when asked, then keeps
/// at most `limit` of them, never fewer than one.
pub fn arrange<R: Rng + ?Sized>(
    mut questions: Vec<QuestionWithOptions>,
    shuffle: bool,
    limit: Option<i64>,
    rng: &mut R,
) -> Vec<QuestionWithOptions> {
    if shuffle {
        questions.shuffle(rng);
    }
    if let Some(limit) = limit {
        let keep = limit.clamp(1, questions.len().max(1) as i64) as usize;
        questions.truncate(keep);
    }
    if shuffle {
        for q in &mut questions {
            q.options.shuffle(rng);
        }
    }
    questions
}

/// Removes correctness flags before questions reach a learner.
pub fn hide_answers(questions: &mut [QuestionWithOptions]) {
    for option in questions.iter_mut().flat_map(|q| q.options.iter_mut()) {
        option.is_correct = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Question, QuestionOption};
    use rand::{SeedableRng, rngs::StdRng};

    fn question(id: i64, options: &[(&str, bool)]) -> QuestionWithOptions {
        QuestionWithOptions {
            question: Question {
                id,
                exam_id: Some(1),
                text: format!("Question {id}"),
                subject: None,
                topic: "General".into(),
                difficulty: "Medium".into(),
                rationale: String::new(),
                hint: None,
                created_at: chrono::Utc::now(),
            },
            options: options
                .iter()
                .enumerate()
                .map(|(i, (text, is_correct))| QuestionOption {
                    id: id * 10 + i as i64,
                    question_id: id,
                    text: text.to_string(),
                    is_correct: Some(*is_correct),
                })
                .collect(),
        }
    }

    #[test]
    fn unscoreable_questions_are_dropped() {
        let kept = sanitize(vec![
            question(1, &[("a", true), ("b", false)]),
            question(2, &[("a", false), ("b", false)]),
            question(3, &[]),
            question(4, &[("  ", true), ("b", false)]),
        ]);
        let ids: Vec<_> = kept.iter().map(|q| q.question.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn blank_options_are_removed_from_kept_questions() {
        let kept = sanitize(vec![question(1, &[("a", true), ("", false), ("c", false)])]);
        assert_eq!(kept[0].options.len(), 2);
    }

    #[test]
    fn limit_is_clamped_between_one_and_the_question_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let all = || (1..=5).map(|id| question(id, &[("a", true), ("b", false)])).collect::<Vec<_>>();
        assert_eq!(arrange(all(), false, Some(3), &mut rng).len(), 3);
        assert_eq!(arrange(all(), false, Some(0), &mut rng).len(), 1);
        assert_eq!(arrange(all(), false, Some(50), &mut rng).len(), 5);
        assert_eq!(arrange(all(), false, None, &mut rng).len(), 5);
    }

    #[test]
    fn unshuffled_order_is_preserved() {
        let mut rng = StdRng::seed_from_u64(7);
        let questions = (1..=4).map(|id| question(id, &[("a", true), ("b", false)])).collect();
        let ids: Vec<_> = arrange(questions, false, None, &mut rng)
            .iter()
            .map(|q| q.question.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn shuffling_keeps_every_question_and_option() {
        let mut rng = StdRng::seed_from_u64(42);
        let questions = (1..=6).map(|id| question(id, &[("a", true), ("b", false), ("c", false)])).collect();
        let arranged = arrange(questions, true, None, &mut rng);
        let mut ids: Vec<_> = arranged.iter().map(|q| q.question.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert!(arranged.iter().all(|q| q.options.len() == 3 && q.has_correct_option()));
    }

    #[test]
    fn hidden_answers_are_not_serialized() {
        let mut questions = vec![question(1, &[("a", true), ("b", false)])];
        hide_answers(&mut questions);
        let json = serde_json::to_value(&questions[0]).unwrap();
        assert!(json["options"][0].get("isCorrect").is_none());
        assert_eq!(json["options"][0]["text"], "a");
    }
}
