//! License categories (duration tiers)

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while parsing or validating categories
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CategoryError {
    #[error("Category list cannot be empty")]
    Empty,

    #[error("Category name cannot be empty")]
    EmptyName,

    #[error("Category name contains invalid character: '{0}'")]
    InvalidCharacter(char),

    #[error("Invalid duration '{0}': expected a whole number of minutes")]
    InvalidDuration(String),

    #[error("Duration of category '{0}' must be greater than zero")]
    ZeroDuration(String),

    #[error("Duplicate category name: '{0}'")]
    Duplicate(String),
}

/// A configured license category and the validity window of its keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseCategory {
    name: String,
    duration_minutes: u32,
}

impl LicenseCategory {
    /// Create a category after validation
    pub fn new(name: impl Into<String>, duration_minutes: u32) -> Result<Self, CategoryError> {
        let name = name.into();
        validate_category_name(&name)?;

        if duration_minutes == 0 {
            return Err(CategoryError::ZeroDuration(name));
        }

        Ok(Self {
            name,
            duration_minutes,
        })
    }

    /// Create a category named after its duration (e.g. `10min`)
    pub fn from_minutes(duration_minutes: u32) -> Result<Self, CategoryError> {
        Self::new(format!("{}min", duration_minutes), duration_minutes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Validity window in milliseconds
    pub fn duration_ms(&self) -> i64 {
        i64::from(self.duration_minutes) * 60_000
    }
}

impl FromStr for LicenseCategory {
    type Err = CategoryError;

    /// Parses `minutes` or `name=minutes`
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let entry = entry.trim();

        match entry.split_once('=') {
            Some((name, minutes)) => Self::new(name.trim(), parse_minutes(minutes)?),
            None => Self::from_minutes(parse_minutes(entry)?),
        }
    }
}

impl std::fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.duration_minutes)
    }
}

fn parse_minutes(value: &str) -> Result<u32, CategoryError> {
    let value = value.trim();
    value
        .parse::<u32>()
        .map_err(|_| CategoryError::InvalidDuration(value.to_string()))
}

/// Validate a category name
///
/// Names end up as JSON object keys and URL segments, so only
/// alphanumerics, `-` and `_` are accepted.
fn validate_category_name(name: &str) -> Result<(), CategoryError> {
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(CategoryError::InvalidCharacter(c));
    }

    Ok(())
}

/// Parse a comma-separated category list such as `10,25,60,120` or
/// `short=10,long=120`
pub fn parse_categories(list: &str) -> Result<Vec<LicenseCategory>, CategoryError> {
    let categories = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(LicenseCategory::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    validate_categories(&categories)?;

    Ok(categories)
}

/// Check that a category set is non-empty and has unique names
fn validate_categories(categories: &[LicenseCategory]) -> Result<(), CategoryError> {
    if categories.is_empty() {
        return Err(CategoryError::Empty);
    }

    let mut seen = HashSet::new();

    for category in categories {
        if !seen.insert(category.name()) {
            return Err(CategoryError::Duplicate(category.name().to_string()));
        }
    }

    Ok(())
}
