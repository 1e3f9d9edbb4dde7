//! Input checks and normalization applied before payloads leave the client.

use regex::Regex;

use crate::errors::AppError;

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    static ref NON_DIGIT_RE: Regex = Regex::new(r"[^0-9]").unwrap();
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Removes masks such as `12.345.678/0001-90` or `(11) 98888-7777`.
pub fn digits_only(value: &str) -> String {
    NON_DIGIT_RE.replace_all(value, "").into_owned()
}

pub fn digits_only_opt(value: Option<&str>) -> Option<String> {
    value.map(digits_only).filter(|digits| !digits.is_empty())
}

pub fn require_id(id: Option<i64>, resource: &str) -> Result<i64, AppError> {
    id.ok_or_else(|| AppError::InvalidInput(format!("{} id is required", resource)))
}

pub fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
