//! Structured Feedback Module
//!
//! Provides machine-readable output for tools driving the checker:
//! - JSON diagnostic reports with a stable code per error category
//! - Fix suggestions ranked by confidence
//! - Per-file summaries of repeated checks

use serde::{Deserialize, Serialize};

use crate::utils::{CompilerError, ErrorCategory};

// ==================== Diagnostic Report ====================

/// A structured report for one failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    pub severity: Severity,

    pub category: ErrorCategory,

    /// Human-readable message
    pub message: String,

    pub location: Location,

    /// Suggested fixes, most likely first
    pub suggestions: Vec<Suggestion>,
}

/// Every checker diagnostic stops the check that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
}

/// Byte range within a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Description of the fix
    pub message: String,

    /// The replacement text
    pub replacement: Option<String>,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl Suggestion {
    fn new(message: impl Into<String>, replacement: Option<String>, confidence: f64) -> Self {
        Self {
            message: message.into(),
            replacement,
            confidence,
        }
    }
}

/// Stable code for each category
pub fn category_code(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::TypeMismatch => "E0001",
        ErrorCategory::Overflow => "E0002",
        ErrorCategory::UnresolvedReference => "E0003",
        ErrorCategory::ArityMismatch => "E0004",
        ErrorCategory::GenericMisuse => "E0005",
        ErrorCategory::Limit => "E0006",
    }
}

impl DiagnosticReport {
    /// Create a report from a checker error
    pub fn from_error(error: &CompilerError, file_name: &str) -> Self {
        let span = error.span();
        let category = error.category();
        let mut report = Self {
            code: category_code(category).to_string(),
            severity: Severity::Error,
            category,
            message: error.to_string(),
            location: Location {
                file: file_name.to_string(),
                start: span.start,
                end: span.end,
            },
            suggestions: suggestions_for(error),
        };
        report.sort_suggestions();
        report
    }

    pub fn add_suggestion(&mut self, message: &str, replacement: Option<String>, confidence: f64) {
        self.suggestions
            .push(Suggestion::new(message, replacement, confidence));
    }

    /// Sort suggestions by confidence (highest first)
    pub fn sort_suggestions(&mut self) {
        self.suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn suggestions_for(error: &CompilerError) -> Vec<Suggestion> {
    match error {
        CompilerError::IncompatibleAssignment { from, to, .. } => vec![Suggestion::new(
            format!("use an explicit `as` cast to convert `{}` to `{}`", from, to),
            Some(format!("as {}", to)),
            0.7,
        )],
        CompilerError::ConstantOutOfRange { value, target, .. } => vec![
            Suggestion::new(
                format!("use a wider type than `{}` to hold {}", target, value),
                None,
                0.6,
            ),
            Suggestion::new("truncate the value with an explicit `as` cast", None, 0.3),
        ],
        CompilerError::FunctionAsValue { .. } => vec![Suggestion::new(
            "take the function's address with `&`",
            Some("&".to_string()),
            0.8,
        )],
        CompilerError::InvalidUnionCast { union, .. } => vec![Suggestion::new(
            format!("test the value with `is` against a member of `{}` first", union),
            None,
            0.5,
        )],
        CompilerError::AssignToImmutable { .. } => vec![Suggestion::new(
            "declare the destination with `var` instead of `let`",
            None,
            0.6,
        )],
        CompilerError::ArgumentCountMismatch { expected, got, .. } => {
            let message = if got < expected {
                format!("add {} more argument(s)", expected - got)
            } else {
                format!("remove {} extra argument(s)", got - expected)
            };
            vec![Suggestion::new(message, None, 0.9)]
        }
        CompilerError::TemplateArityMismatch { expected, .. } => vec![Suggestion::new(
            format!("supply exactly {} type argument(s)", expected),
            None,
            0.9,
        )],
        CompilerError::GenericNotApplied { name, .. } => vec![Suggestion::new(
            format!("apply `{}` to type arguments with `@[..]`", name),
            Some(format!("{}@[..]", name)),
            0.8,
        )],
        CompilerError::CannotInferTypeArgument { name, .. } => vec![Suggestion::new(
            format!("call `{}` with explicit type arguments", name),
            Some(format!("{}@[..]", name)),
            0.8,
        )],
        CompilerError::NestingTooDeep { .. } => vec![Suggestion::new(
            "split the expression using intermediate variables",
            None,
            0.5,
        )],
        _ => vec![],
    }
}

// ==================== File Summary ====================

/// All diagnostics collected while checking one source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileFeedback {
    pub source_file: String,
    pub checked: usize,
    pub diagnostics: Vec<DiagnosticReport>,
}

impl FileFeedback {
    pub fn new(source_file: &str) -> Self {
        Self {
            source_file: source_file.to_string(),
            ..Self::default()
        }
    }

    /// Record the outcome of one check
    pub fn record<T>(&mut self, outcome: &Result<T, CompilerError>) {
        self.checked += 1;
        if let Err(error) = outcome {
            self.diagnostics
                .push(DiagnosticReport::from_error(error, &self.source_file));
        }
    }

    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
