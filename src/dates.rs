//! Conversions between the textual date forms a project passes through.
//!
//! Spreadsheet exports arrive as `DD/MM/YYYY HH:MM`, the edit form posts
//! `YYYY-MM-DDTHH:MM`, and the key-value store keeps that same ISO-like
//! form as text. A missing value is always `None`, never an empty string.

use chrono::NaiveDateTime;

/// `day/month/year hour:minute`, as exported by the spreadsheet.
pub const IMPORT_FORMAT: &str = "%d/%m/%Y %H:%M";
/// `year-month-dayThour:minute`, as posted by `<input type="datetime-local">`.
pub const FORM_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DISPLAY_FORMAT: &str = "%a, %d %b, %Y, %I:%M %p";
pub const UNSET_PLACEHOLDER: &str = "Not set";

const NULL_SENTINELS: [&str; 5] = ["nan", "na", "n/a", "null", "none"];

// Rows written by older relational imports carry seconds and a space separator.
const LEGACY_STORAGE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' does not match the expected format {expected}")]
pub struct FormatError {
    pub value: String,
    pub expected: &'static str,
}

/// True for blank input and the "not a value" markers spreadsheets emit.
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || NULL_SENTINELS
            .iter()
            .any(|sentinel| value.eq_ignore_ascii_case(sentinel))
}

pub fn parse_import(value: &str) -> Result<Option<NaiveDateTime>, FormatError> {
    parse_optional(value, IMPORT_FORMAT, "DD/MM/YYYY HH:MM")
}

pub fn parse_form(value: &str) -> Result<Option<NaiveDateTime>, FormatError> {
    parse_optional(value, FORM_FORMAT, "YYYY-MM-DDTHH:MM")
}

fn parse_optional(
    value: &str,
    format: &str,
    expected: &'static str,
) -> Result<Option<NaiveDateTime>, FormatError> {
    if is_unset(value) {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value.trim(), format)
        .map(Some)
        .map_err(|_| FormatError {
            value: value.to_string(),
            expected,
        })
}

pub fn to_storage(value: &NaiveDateTime) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

pub fn from_storage(value: &str) -> Result<NaiveDateTime, FormatError> {
    let value = value.trim();
    std::iter::once(STORAGE_FORMAT)
        .chain(LEGACY_STORAGE_FORMATS)
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| FormatError {
            value: value.to_string(),
            expected: "YYYY-MM-DDTHH:MM",
        })
}

/// Value for a `datetime-local` input, empty when unset.
pub fn to_form(value: Option<&NaiveDateTime>) -> String {
    value
        .map(|v| v.format(FORM_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn display(value: Option<&NaiveDateTime>) -> String {
    match value {
        Some(value) => value.format(DISPLAY_FORMAT).to_string(),
        None => UNSET_PLACEHOLDER.to_string(),
    }
}

/// Parse the `continuous` column. Blank and sentinel values mean no.
pub fn parse_flag(value: &str) -> Result<bool, FormatError> {
    if is_unset(value) {
        return Ok(false);
    }
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" | "on" | "x" => Ok(true),
        "0" | "false" | "no" | "n" | "f" | "off" => Ok(false),
        _ => Err(FormatError {
            value: value.to_string(),
            expected: "a yes/no flag",
        }),
    }
}
