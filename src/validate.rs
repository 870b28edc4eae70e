use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

static DOCUMENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{6,15}$").expect("document number pattern"));

/// Checks a raw reply against the document-number grammar: 6 to 15 digits,
/// nothing else. Returns the trimmed digits on success.
pub fn validate_document_number(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if DOCUMENT_NUMBER.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError(
            "that doesn't look like a document number. Please send only digits (6 to 15), without dots or dashes.".into(),
        ))
    }
}

/// Checks a raw reply against a numbered menu: a 1-based integer within
/// `option_count`. Returns the selected index.
pub fn validate_menu_choice(raw: &str, option_count: usize) -> Result<usize, ValidationError> {
    let out_of_range = || {
        ValidationError(format!(
            "please reply with a number between 1 and {option_count}."
        ))
    };
    let index: usize = raw.trim().parse().map_err(|_| out_of_range())?;
    if (1..=option_count).contains(&index) {
        Ok(index)
    } else {
        Err(out_of_range())
    }
}
