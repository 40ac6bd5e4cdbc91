//! Caller-owned diagnostic collection.
//!
//! The parser and the runner never print. They append [`Diagnostic`]s to a
//! [`Diagnostics`] value the host passes in, and the host renders them once
//! the run is over. A fresh collector per run keeps repeated runs in one
//! process from seeing each other's reports.

use core::fmt;

use crate::span::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Self::Notice => "note",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a diagnostic points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Source position, when known.
    pub pos: Option<Pos>,
    /// Index into the program, for runtime reports.
    pub instruction: Option<usize>,
}

impl Location {
    pub fn source(pos: Pos) -> Self {
        Self {
            pos: Some(pos),
            instruction: None,
        }
    }

    pub fn instruction(index: usize, pos: Option<Pos>) -> Self {
        Self {
            pos,
            instruction: Some(index),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.instruction, self.pos) {
            (Some(index), Some(pos)) => write!(f, "instruction {index} ({pos})"),
            (Some(index), None) => write!(f, "instruction {index}"),
            (None, Some(pos)) => write!(f, "{pos}"),
            (None, None) => f.write_str("<unknown>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable kebab-case identifier, e.g. `stack-underflow`.
    pub code: &'static str,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} at {}",
            self.severity, self.code, self.message, self.location
        )
    }
}

/// Ordered list of diagnostics from one parse and/or one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append a diagnostic built from its parts.
    pub fn report(
        &mut self,
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        location: Location,
    ) {
        self.push(Diagnostic::new(severity, code, message, location));
    }

    pub fn notice(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        location: Location,
    ) {
        self.report(Severity::Notice, code, message, location);
    }

    pub fn warning(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        location: Location,
    ) {
        self.report(Severity::Warning, code, message, location);
    }

    pub fn error(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        location: Location,
    ) {
        self.report(Severity::Error, code, message, location);
    }

    /// True if any entry has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    /// Number of entries carrying `code`.
    pub fn count_code(&self, code: &str) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_errors_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.notice("input-exhausted", "eof", Location::default());
        diags.warning("duplicate-label", "twice", Location::default());
        assert!(!diags.has_errors());

        diags.error("stack-underflow", "empty", Location::instruction(3, None));
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn display_includes_code_and_location() {
        let d = Diagnostic::new(
            Severity::Error,
            "empty-label",
            "label is empty",
            Location::source(Pos::new(4, 2, 1)),
        );
        assert_eq!(d.to_string(), "error[empty-label]: label is empty at 2:1");
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Notice < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
