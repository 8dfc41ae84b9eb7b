//! Answer validation
//!
//! Free-text answers from the dialogue collaborator are validated here,
//! at the boundary, before anything reaches the scorer or the planner.
//! Scoring and allocation themselves never fail.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::domain::ComplexityPreference;
use crate::scoring::FactorTag;

/// An answer failed basic shape checks
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid file impact count '{0}': expected a non-negative integer")]
    FileImpact(String),

    #[error("Expected yes or no, got '{0}'")]
    YesNo(String),

    #[error("Unknown complexity preference '{0}': use full-breakdown, high-level, or ask-each-time")]
    Preference(String),

    #[error("Unknown factor tag '{0}'")]
    UnknownTag(String),

    #[error("Answer must not be empty")]
    Empty,
}

/// Reject empty answers
pub fn non_empty(answer: &str) -> Result<String, ValidationError> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Parse a file impact count. Negative numbers are rejected here, not
/// silently truncated.
pub fn parse_file_impact(answer: &str) -> Result<u32, ValidationError> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ValidationError::FileImpact(trimmed.to_string()))
}

/// Parse a yes/no answer
pub fn parse_yes_no(answer: &str) -> Result<bool, ValidationError> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" => Ok(true),
        "n" | "no" | "false" => Ok(false),
        other => Err(ValidationError::YesNo(other.to_string())),
    }
}

/// Parse a complexity preference
pub fn parse_preference(answer: &str) -> Result<ComplexityPreference, ValidationError> {
    match answer.trim().to_lowercase().replace('_', "-").as_str() {
        "full" | "full-breakdown" => Ok(ComplexityPreference::FullBreakdown),
        "high" | "high-level" => Ok(ComplexityPreference::HighLevel),
        "ask" | "ask-each-time" => Ok(ComplexityPreference::AskEachTime),
        other => Err(ValidationError::Preference(other.to_string())),
    }
}

/// Split a comma-separated answer into trimmed, non-empty items.
/// "none" (alone) means an empty list.
pub fn parse_list(answer: &str) -> Vec<String> {
    let trimmed = answer.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a comma-separated list of factor tags
pub fn parse_flags(answer: &str) -> Result<BTreeSet<FactorTag>, ValidationError> {
    parse_list(answer)
        .iter()
        .map(|item| {
            item.parse::<FactorTag>()
                .map_err(|_| ValidationError::UnknownTag(item.clone()))
        })
        .collect()
}
