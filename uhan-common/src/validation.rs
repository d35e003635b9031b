//! Form validation
//!
//! Validation never fails with an error value. Problems are collected into a
//! [`ValidationReport`] so the caller can show every offending field at once.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::form::{format_number, Attachment, FormModel, PHOTO_FIELD, SIGNATURE_FIELD};
use crate::score::ScoredField;

/// Field that must be non-blank before a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredField {
    pub key: &'static str,
    pub label: &'static str,
}

impl RequiredField {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Identifier field that must have a known shape once filled in
#[derive(Debug, Clone, Copy)]
pub struct IdentifierRule {
    pub key: &'static str,
    pub label: &'static str,
    /// Sample value quoted in the error message
    pub example: &'static str,
    pub check: fn(&str) -> bool,
}

impl IdentifierRule {
    /// Rule for a field holding a ULP reference such as `ULP-IND-KA-00042`
    pub const fn ulp(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            example: "ULP-IND-KA-00042",
            check: is_ulp_reference,
        }
    }
}

fn ulp_reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^ULP(-[A-Z0-9]+)+$").ok())
        .as_ref()
}

/// `ULP` followed by one or more dash-separated uppercase segments
pub fn is_ulp_reference(value: &str) -> bool {
    ulp_reference_pattern().is_some_and(|re| re.is_match(value.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// One-line summary, e.g. for a toast
    pub fn summary(&self) -> String {
        let fields: Vec<&str> = self.errors.iter().map(|e| e.field.as_str()).collect();
        format!("Please fix the following fields: {}", fields.join(", "))
    }
}

/// Check required fields and any attached images
pub fn validate_form(form: &FormModel, required: &[RequiredField]) -> ValidationReport {
    let mut report = ValidationReport::new();

    for field in required {
        if form.text(field.key).is_none() {
            report.push(field.key, format!("{} is required", field.label));
        }
    }

    for key in [PHOTO_FIELD, SIGNATURE_FIELD] {
        if let Some(uri) = form.text(key) {
            if let Err(e) = Attachment::parse(&uri) {
                report.push(key, e.to_string());
            }
        }
    }

    report
}

/// Report filled-in numeric fields that are not numbers or fall outside
/// their `[min, max]`
pub fn check_ranges(form: &FormModel, fields: &[ScoredField], report: &mut ValidationReport) {
    for field in fields {
        let Some(value) = form.get(field.key).filter(|v| !v.is_blank()) else {
            continue;
        };
        match value.as_number() {
            Some(n) if (field.min..=field.max).contains(&n) => {}
            Some(_) => report.push(
                field.key,
                format!(
                    "{} must be between {} and {}",
                    field.label,
                    format_number(field.min),
                    format_number(field.max)
                ),
            ),
            None => report.push(field.key, format!("{} must be a number", field.label)),
        }
    }
}

/// Report filled-in identifier fields that do not match their rule
pub fn check_identifiers(form: &FormModel, rules: &[IdentifierRule], report: &mut ValidationReport) {
    for rule in rules {
        if let Some(value) = form.text(rule.key) {
            if !(rule.check)(&value) {
                report.push(
                    rule.key,
                    format!("{} must look like {}", rule.label, rule.example),
                );
            }
        }
    }
}
