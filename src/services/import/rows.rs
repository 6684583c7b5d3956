// src/services/import/rows.rs

use std::fmt;

use serde::{Serialize, Serializer};

use super::answer::resolve_correct_index;
use super::headers::{Field, HeaderIndex};
use crate::config::{DEFAULT_DIFFICULTY, DEFAULT_TOPIC};
use crate::models::question::{DraftOption, QuestionDraft};

/// Why a row was left out of an import. Reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingQuestionText,
    TooFewOptions,
    UnresolvedCorrectAnswer,
    NoCorrectOption,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingQuestionText => "Missing question text",
            SkipReason::TooFewOptions => "Less than 2 options",
            SkipReason::UnresolvedCorrectAnswer => "Cannot determine correct answer",
            SkipReason::NoCorrectOption => "No correct option found after parsing",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    pub reason: SkipReason,
    /// The prompt, once it is known.
    pub question: Option<String>,
}

impl RowRejection {
    fn new(reason: SkipReason, question: Option<&str>) -> Self {
        Self {
            reason,
            question: question.map(str::to_string),
        }
    }
}

/// Trims a cell, dropping a leading BOM and one quote character at either end.
pub fn normalize_value(raw: &str) -> String {
    let value = raw.trim_start_matches('\u{feff}').trim();
    let value = value
        .strip_prefix(['"', '\''])
        .unwrap_or(value);
    let value = value
        .strip_suffix(['"', '\''])
        .unwrap_or(value);
    value.to_string()
}

/// Splits a combined options cell on `|`, `;` or `,`.
pub fn split_options(raw: &str) -> Vec<String> {
    raw.split(['|', ';', ','])
        .map(normalize_value)
        .filter(|s| !s.is_empty())
        .collect()
}

fn optional(index: &HeaderIndex, row: &[impl AsRef<str>], field: Field) -> Option<String> {
    index
        .cell(row, field)
        .map(normalize_value)
        .filter(|s| !s.is_empty())
}

/// Turns one data row into a question draft.
pub fn normalize_row<S: AsRef<str>>(
    index: &HeaderIndex,
    row: &[S],
) -> Result<QuestionDraft, RowRejection> {
    let text = index
        .cell(row, Field::Question)
        .map(str::trim)
        .unwrap_or("");
    if text.is_empty() {
        return Err(RowRejection::new(SkipReason::MissingQuestionText, None));
    }

    let option_texts = match index.cell(row, Field::Options) {
        Some(combined) => split_options(combined),
        None => index
            .option_cells(row)
            .into_iter()
            .map(normalize_value)
            .filter(|s| !s.is_empty())
            .collect(),
    };
    if option_texts.len() < 2 {
        return Err(RowRejection::new(SkipReason::TooFewOptions, Some(text)));
    }

    let correct_cell = index
        .cell(row, Field::CorrectAnswer)
        .map(normalize_value)
        .unwrap_or_default();
    let Some(correct_index) = resolve_correct_index(&correct_cell, &option_texts) else {
        return Err(RowRejection::new(
            SkipReason::UnresolvedCorrectAnswer,
            Some(text),
        ));
    };

    let options: Vec<DraftOption> = option_texts
        .into_iter()
        .enumerate()
        .map(|(position, text)| DraftOption {
            text,
            is_correct: position == correct_index,
        })
        .collect();
    if !options.iter().any(|o| o.is_correct) {
        return Err(RowRejection::new(SkipReason::NoCorrectOption, Some(text)));
    }

    Ok(QuestionDraft {
        text: text.to_string(),
        subject: optional(index, row, Field::Subject),
        topic: optional(index, row, Field::Topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        difficulty: optional(index, row, Field::Difficulty)
            .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        rationale: optional(index, row, Field::Rationale).unwrap_or_default(),
        hint: optional(index, row, Field::Hint),
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(headers: &[&str], row: &[&str]) -> Result<QuestionDraft, RowRejection> {
        normalize_row(&HeaderIndex::new(headers), row)
    }

    fn correct_text(draft: &QuestionDraft) -> &str {
        let correct: Vec<_> = draft.options.iter().filter(|o| o.is_correct).collect();
        assert_eq!(correct.len(), 1, "exactly one option should be correct");
        &correct[0].text
    }

    #[test]
    fn letter_answer_marks_first_pipe_separated_option() {
        let d = draft(
            &["Question", "Options", "Correct Answer"],
            &["Capital of France?", "Paris|Berlin|Madrid", "A"],
        )
        .unwrap();
        assert_eq!(d.options.len(), 3);
        assert_eq!(correct_text(&d), "Paris");
        assert!(d.options[0].is_correct);
    }

    #[test]
    fn numeric_answer_is_one_based() {
        let d = draft(&["Question", "Options", "Answer"], &["2 + 2?", "3,4,5", "2"]).unwrap();
        assert_eq!(correct_text(&d), "4");
    }

    #[test]
    fn options_are_split_on_every_separator_and_dequoted() {
        assert_eq!(
            split_options(" \"Paris\" ; 'Berlin'|Madrid,, "),
            vec!["Paris", "Berlin", "Madrid"]
        );
    }

    #[test]
    fn letter_columns_are_used_without_a_combined_column() {
        let d = draft(
            &["Prompt", "Option A", "Option_B", "OptionC", "Option D", "Correct"],
            &["Largest planet?", "Mars", "Jupiter", "", "Venus", "jupiter"],
        )
        .unwrap();
        let texts: Vec<_> = d.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Mars", "Jupiter", "Venus"]);
        assert_eq!(correct_text(&d), "Jupiter");
    }

    #[test]
    fn combined_column_takes_precedence_even_when_empty() {
        let err = draft(
            &["Question", "Options", "Option A", "Option B", "Answer"],
            &["Q?", "", "x", "y", "A"],
        )
        .unwrap_err();
        assert_eq!(err.reason, SkipReason::TooFewOptions);
    }

    #[test]
    fn blank_question_text_is_rejected_without_a_question() {
        let err = draft(&["Question", "Options", "Answer"], &["   ", "a|b", "A"]).unwrap_err();
        assert_eq!(err.reason, SkipReason::MissingQuestionText);
        assert_eq!(err.question, None);
    }

    #[test]
    fn missing_question_column_is_rejected() {
        let err = draft(&["Options", "Answer"], &["a|b", "A"]).unwrap_err();
        assert_eq!(err.reason, SkipReason::MissingQuestionText);
    }

    #[test]
    fn single_option_is_rejected_with_the_question() {
        let err = draft(&["Question", "Options", "Answer"], &["Q?", "only", "A"]).unwrap_err();
        assert_eq!(err.reason, SkipReason::TooFewOptions);
        assert_eq!(err.question.as_deref(), Some("Q?"));
    }

    #[test]
    fn undecodable_answer_is_rejected() {
        let err = draft(&["Question", "Options", "Answer"], &["Q?", "a|b", "maybe"]).unwrap_err();
        assert_eq!(err.reason, SkipReason::UnresolvedCorrectAnswer);
        assert_eq!(err.reason.to_string(), "Cannot determine correct answer");
    }

    #[test]
    fn optional_fields_default_and_blank_ones_are_unset() {
        let d = draft(
            &["Question", "Options", "Answer", "Subject", "Topic", "Difficulty", "Hint"],
            &["Q?", "a|b", "B", " ", "", "", ""],
        )
        .unwrap();
        assert_eq!(d.subject, None);
        assert_eq!(d.hint, None);
        assert_eq!(d.topic, "General");
        assert_eq!(d.difficulty, "Medium");
        assert_eq!(d.rationale, "");
    }

    #[test]
    fn optional_fields_are_trimmed() {
        let d = draft(
            &["Question", "Options", "Answer", "Subject", "Topic", "Difficulty", "Explanation", "Hint"],
            &["Q?", "a|b", "B", " Math ", " Algebra", "Hard ", " because ", " think "],
        )
        .unwrap();
        assert_eq!(d.subject.as_deref(), Some("Math"));
        assert_eq!(d.topic, "Algebra");
        assert_eq!(d.difficulty, "Hard");
        assert_eq!(d.rationale, "because");
        assert_eq!(d.hint.as_deref(), Some("think"));
    }

    #[test]
    fn skip_reasons_serialize_to_their_messages() {
        let json = serde_json::to_string(&SkipReason::NoCorrectOption).unwrap();
        assert_eq!(json, "\"No correct option found after parsing\"");
    }
}
