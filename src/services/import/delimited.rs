// src/services/import/delimited.rs

use super::{ImportError, Table};

/// Reads comma-separated text with a header row.
pub fn read(bytes: &[u8]) -> Result<Table, ImportError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::Encoding)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_cells_keep_their_separators() {
        let table = read(b"Question,Options,Answer\n\"Capital, France?\",\"Paris|Berlin\",A\n").unwrap();
        assert_eq!(table.headers, vec!["Question", "Options", "Answer"]);
        assert_eq!(table.rows, vec![vec!["Capital, France?", "Paris|Berlin", "A"]]);
    }

    #[test]
    fn bom_stays_on_the_first_header_for_the_index_to_strip() {
        let table = read("\u{feff}Question,Answer\nQ,A\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0].trim_start_matches('\u{feff}'), "Question");
    }

    #[test]
    fn ragged_records_are_a_parse_error() {
        let err = read(b"Question,Options\nQ,a|b,extra\n").unwrap_err();
        assert!(matches!(err, ImportError::Delimited(_)));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = read(&[0x51, 0x0a, 0xff, 0xfe, 0x0a]).unwrap_err();
        assert!(matches!(err, ImportError::Encoding));
    }

    #[test]
    fn empty_file_has_no_rows() {
        let table = read(b"").unwrap();
        assert!(table.rows.is_empty());
    }
}
