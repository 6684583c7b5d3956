// src/services/import/answer.rs

/// One way of reading the correct-answer cell. Returns an in-range option
/// index or `None` to pass the cell to the next decoder.
type Decoder = fn(&str, &[String]) -> Option<usize>;

/// Tried in order; the first decoder that yields an index wins.
const DECODERS: [Decoder; 3] = [by_letter, by_number, by_text];

/// Resolves the correct-answer cell against the extracted options.
pub fn resolve_correct_index(cell: &str, options: &[String]) -> Option<usize> {
    DECODERS.iter().find_map(|decode| decode(cell, options))
}

fn in_range(index: usize, options: &[String]) -> Option<usize> {
    (index < options.len()).then_some(index)
}

/// "A"/"a" is the first option, "B" the second and so on.
fn by_letter(cell: &str, options: &[String]) -> Option<usize> {
    let mut chars = cell.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            in_range((c.to_ascii_lowercase() as u8 - b'a') as usize, options)
        }
        _ => None,
    }
}

/// 1-based position, so "1" is the first option. Whole-number decimals
/// such as "2.0" count as their integer.
fn by_number(cell: &str, options: &[String]) -> Option<usize> {
    let cell = cell.trim();
    let position: usize = match cell.parse() {
        Ok(position) => position,
        Err(_) => {
            let value: f64 = cell.parse().ok()?;
            if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
                return None;
            }
            value as usize
        }
    };
    in_range(position.checked_sub(1)?, options)
}

/// Case-insensitive exact match on the option text.
fn by_text(cell: &str, options: &[String]) -> Option<usize> {
    let wanted = cell.trim().to_lowercase();
    options
        .iter()
        .position(|option| option.trim().to_lowercase() == wanted)
}
