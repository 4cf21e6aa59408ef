//! Field-level input validation.
//!
//! Validation failures are collected rather than short-circuited, so that a client gets every problem with a request
//! in a single response.
use std::fmt::Display;

use regex::Regex;
use serde::{Deserialize, Serialize};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single, request-level error that is not tied to a specific field.
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::new().with("", message)
    }

    pub fn with<F: Into<String>, S: Into<String>>(mut self, field: F, message: S) -> Self {
        self.add(field, message);
        self
    }

    pub fn add<F: Into<String>, S: Into<String>>(&mut self, field: F, message: S) {
        self.0.push(FieldError { field: field.into(), message: message.into() });
    }

    /// Adds the error if `condition` is false.
    pub fn check<F: Into<String>, S: Into<String>>(&mut self, condition: bool, field: F, message: S) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msgs = self.0.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
        write!(f, "{msgs}")
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    Regex::new(EMAIL_PATTERN).map(|re| re.is_match(value.trim())).unwrap_or(false)
}
