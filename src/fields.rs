//! Field-value maps and the small value rules shared by every tab.

use serde_json::Value;
use std::fmt;

/// Field id to value, as captured from or written to a tab.
pub type FieldMap = serde_json::Map<String, Value>;

/// A value carries no information: null, or a string that is empty after trimming.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Drop every blank entry, so presence of a key implies a meaningful value.
pub fn strip_blank(data: FieldMap) -> FieldMap {
    data.into_iter().filter(|(_, v)| !is_blank(v)).collect()
}

/// Render a stored value the way an input element would hold it.
pub fn value_to_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Hyphenate a Korean phone number as the user types it.
///
/// Non-digits are dropped. Lengths that fit no known pattern are returned as
/// bare digits.
pub fn format_phone(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0..=3 => digits,
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        11 => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        _ => digits,
    }
}

/// Accepted project-number prefixes.
pub const PROJECT_NO_PREFIXES: [&str; 2] = ["NA/", "NE/"];

/// A validated project number such as `NA/1234`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNo {
    prefix: &'static str,
    number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("프로젝트 No.는 NA/ 또는 NE/로 시작하고 4자리 숫자여야 합니다. (입력값: {0:?})")]
pub struct InvalidProjectNo(pub String);

impl ProjectNo {
    pub fn parse(raw: &str) -> Result<Self, InvalidProjectNo> {
        let trimmed = raw.trim();
        let prefix = PROJECT_NO_PREFIXES
            .iter()
            .copied()
            .find(|p| trimmed.starts_with(p))
            .ok_or_else(|| InvalidProjectNo(raw.to_string()))?;
        let number = &trimmed[prefix.len()..];
        if number.len() != 4 || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidProjectNo(raw.to_string()));
        }
        Ok(Self {
            prefix,
            number: number.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        self.prefix
    }

    pub fn number(&self) -> &str {
        &self.number
    }
}

impl fmt::Display for ProjectNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.number)
    }
}

/// Split a stored project number back into its prefix and digits fields.
///
/// The prefix is always the first three characters (`NA/`, `NE/`).
pub fn split_project_no(project_no: &str) -> (String, String) {
    let mut chars = project_no.chars();
    let prefix: String = chars.by_ref().take(3).collect();
    (prefix, chars.collect())
}
