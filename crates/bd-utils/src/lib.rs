//! Shared helpers and error types for BankDesk.

use thiserror::Error;

/// Result type for shared helpers.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// Shared error variants for cross-crate helpers.
#[derive(Debug, Error)]
pub enum UtilsError {
    /// Form input could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Parse a decimal typed into a form field. Accepts a comma as the
/// decimal separator and an optional trailing percent sign.
pub fn parse_decimal(input: &str) -> UtilsResult<f64> {
    let cleaned = input.trim().trim_end_matches('%').trim().replace(',', ".");
    if cleaned.is_empty() {
        return Err(UtilsError::Parse("a number is required".into()));
    }
    let value: f64 = cleaned
        .parse()
        .map_err(|_| UtilsError::Parse(format!("'{}' is not a number", input.trim())))?;
    if !value.is_finite() {
        return Err(UtilsError::Parse(format!("'{}' is not a number", input.trim())));
    }
    Ok(value)
}

/// Parse an optional decimal; blank input means no value.
pub fn parse_optional_decimal(input: &str) -> UtilsResult<Option<f64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_decimal(input).map(Some)
}

/// Parse a whole number of years.
pub fn parse_whole(input: &str) -> UtilsResult<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UtilsError::Parse("a whole number is required".into()));
    }
    trimmed
        .parse()
        .map_err(|_| UtilsError::Parse(format!("'{trimmed}' is not a whole number")))
}

/// Trimmed text, or `None` when nothing but whitespace was entered.
pub fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Format a percentage without trailing zeros.
pub fn format_percent(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}%")
}
