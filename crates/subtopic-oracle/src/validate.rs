//! Parse-and-validate functions for raw oracle answers.
//!
//! Both return `Err(OracleError::MalformedResponse)` for answers that do not
//! have the requested shape; the retry loops treat that as a spent attempt.

use crate::OracleError;

/// Decode an enumeration answer: a JSON array whose elements are all strings.
///
/// Surrounding whitespace is ignored; anything else (prose, code fences,
/// objects, numbers inside the array) is rejected.
pub fn parse_subtopic_list(raw: &str) -> Result<Vec<String>, OracleError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| OracleError::malformed(format!("not valid JSON: {e}")))?;

    let items = value
        .as_array()
        .ok_or_else(|| OracleError::malformed("expected a JSON array"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| OracleError::malformed(format!("element {i} is not a string")))
        })
        .collect()
}

/// Decode a selection answer: a bare integer in `[0, candidate_count)`.
pub fn parse_selection(raw: &str, candidate_count: usize) -> Result<usize, OracleError> {
    let trimmed = raw.trim();
    let index: i64 = trimmed
        .parse()
        .map_err(|_| OracleError::malformed(format!("not an integer: {trimmed:?}")))?;

    if index < 0 || index as u64 >= candidate_count as u64 {
        return Err(OracleError::malformed(format!(
            "index {index} outside [0, {candidate_count})"
        )));
    }
    Ok(index as usize)
}
