// src/services/import/headers.rs

use std::collections::HashMap;

use crate::config::MAX_OPTION_COLUMNS;

/// A logical column the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Question,
    Options,
    /// One of the per-letter option columns, zero-based ("Option A" is 0).
    OptionLetter(usize),
    CorrectAnswer,
    Subject,
    Topic,
    Difficulty,
    Rationale,
    Hint,
}

impl Field {
    /// Accepted header spellings, compared after `normalize_header`.
    fn aliases(self) -> Vec<String> {
        let fixed: &[&str] = match self {
            Field::Question => &["Question", "Text", "Prompt"],
            Field::Options => &["Options"],
            Field::CorrectAnswer => &[
                "Correct Answer",
                "correct_answer",
                "Answer",
                "Correct Option",
                "Correct",
            ],
            Field::Subject => &["Subject"],
            Field::Topic => &["Topic"],
            Field::Difficulty => &["Difficulty"],
            Field::Rationale => &["Rationale", "Explanation"],
            Field::Hint => &["Hint"],
            Field::OptionLetter(index) => {
                let letter = option_letter(index);
                return vec![
                    format!("Option {letter}"),
                    format!("Option_{letter}"),
                    format!("Option{letter}"),
                ];
            }
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }
}

fn all_fields() -> impl Iterator<Item = Field> {
    [
        Field::Question,
        Field::Options,
        Field::CorrectAnswer,
        Field::Subject,
        Field::Topic,
        Field::Difficulty,
        Field::Rationale,
        Field::Hint,
    ]
    .into_iter()
    .chain((0..MAX_OPTION_COLUMNS).map(Field::OptionLetter))
}

/// Letter used for the option column at `index` ('A' for 0).
pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Lowercased header with a leading BOM, whitespace and surrounding quotes removed.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// Maps a file's header row onto importer fields. Built once per file.
#[derive(Debug, Default)]
pub struct HeaderIndex {
    resolved: HashMap<Field, usize>,
}

impl HeaderIndex {
    /// When two columns normalize to the same name the first one wins.
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut columns = HashMap::with_capacity(headers.len());
        for (position, header) in headers.iter().enumerate() {
            columns
                .entry(normalize_header(header.as_ref()))
                .or_insert(position);
        }

        let resolved = all_fields()
            .filter_map(|field| {
                field
                    .aliases()
                    .iter()
                    .find_map(|alias| columns.get(&normalize_header(alias)).copied())
                    .map(|position| (field, position))
            })
            .collect();

        Self { resolved }
    }

    /// Column position of `field`; aliases were tried in order.
    pub fn column(&self, field: Field) -> Option<usize> {
        self.resolved.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.column(field).is_some()
    }

    /// Cell for `field` in `row`. A short row reads as an empty cell when
    /// the column exists; `None` means the file has no such column.
    pub fn cell<'r, S: AsRef<str>>(&self, row: &'r [S], field: Field) -> Option<&'r str> {
        self.column(field)
            .map(|position| row.get(position).map(|c| c.as_ref()).unwrap_or(""))
    }

    /// Per-letter option cells in letter order, for columns that exist.
    pub fn option_cells<'r, S: AsRef<str>>(&self, row: &'r [S]) -> Vec<&'r str> {
        (0..MAX_OPTION_COLUMNS)
            .filter_map(|index| self.cell(row, Field::OptionLetter(index)))
            .collect()
    }
}
