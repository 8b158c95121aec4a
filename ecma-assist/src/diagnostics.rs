use std::fmt;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        match self.span {
            Some(span) => write!(
                f,
                "{label} at line {}, column {}: {}",
                span.line, span.column, self.message
            ),
            None => write!(f, "{label}: {}", self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_error_with_span<S: Into<String>>(&mut self, message: S, span: Option<SourceSpan>) {
        self.entries.push(Diagnostic {
            message: message.into(),
            level: DiagnosticLevel::Error,
            span,
        });
    }

    pub fn push_warning_with_span<S: Into<String>>(
        &mut self,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.entries.push(Diagnostic {
            message: message.into(),
            level: DiagnosticLevel::Warning,
            span,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
