//! Structured build diagnostics.
//!
//! Every failure the engine can report is turned into a [`BuildDiagnostic`]
//! before it leaves the crate. Fatal runs return all of them at once in a
//! [`BuildReport`] instead of stopping at the first.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnresolvedBareSpecifier,
    InvalidSpecifier,
    SyntaxError,
    ReadFailure,
    UnreachableEntryPoint,
    CycleWithoutVersionPolicy,
    EmptyChunk,
    MissingExport,
    WriteError,
    InvalidConfig,
}

impl DiagnosticKind {
    /// Stable code used by miette renderers and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnresolvedBareSpecifier => "kiln::unresolved_bare_specifier",
            Self::InvalidSpecifier => "kiln::invalid_specifier",
            Self::SyntaxError => "kiln::syntax_error",
            Self::ReadFailure => "kiln::read_failure",
            Self::UnreachableEntryPoint => "kiln::unreachable_entry_point",
            Self::CycleWithoutVersionPolicy => "kiln::cycle_without_version_policy",
            Self::EmptyChunk => "kiln::empty_chunk",
            Self::MissingExport => "kiln::missing_export",
            Self::WriteError => "kiln::write_error",
            Self::InvalidConfig => "kiln::invalid_config",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// 1-based line and column plus the raw byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl SourcePosition {
    /// Locate a byte offset in `text`. Offsets past the end clamp to it.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = &text.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let column = text
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count()) as u32
            + 1;
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub url: Option<Url>,
    pub specifier: Option<String>,
    pub position: Option<SourcePosition>,
    /// Import chain from an entry point to `url`, entry first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<Url>,
}

impl BuildDiagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            url: None,
            specifier: None,
            position: None,
            chain: Vec::new(),
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, message)
        }
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_specifier(mut self, specifier: impl Into<String>) -> Self {
        self.specifier = Some(specifier.into());
        self
    }

    pub fn with_position(mut self, position: Option<SourcePosition>) -> Self {
        self.position = position;
        self
    }

    pub fn with_chain(mut self, chain: Vec<Url>) -> Self {
        self.chain = chain;
        self
    }

    /// Downgrade to a warning, keeping everything else.
    pub fn into_warning(self) -> Self {
        Self {
            severity: Severity::Warning,
            ..self
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)?;
        if let Some(url) = &self.url {
            write!(f, " ({}", url)?;
            if let Some(position) = &self.position {
                write!(f, ":{}", position)?;
            }
            write!(f, ")")?;
        }
        if self.chain.len() > 1 {
            let chain: Vec<&str> = self.chain.iter().map(Url::path).collect();
            write!(f, "\n    via {}", chain.join(" -> "))?;
        }
        Ok(())
    }
}

/// Aggregated diagnostics for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl BuildReport {
    pub fn new(diagnostics: Vec<BuildDiagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn errors(&self) -> impl Iterator<Item = &BuildDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &BuildDiagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.error_count();
        write!(
            f,
            "{} error{}",
            errors,
            if errors == 1 { "" } else { "s" }
        )?;
        for diagnostic in self.errors() {
            write!(f, "\n  {}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_offset() {
        let text = "line one\nline two\nthird";
        let pos = SourcePosition::from_offset(text, 14);
        assert_eq!((pos.line, pos.column), (2, 6));

        let pos = SourcePosition::from_offset(text, 0);
        assert_eq!((pos.line, pos.column), (1, 1));

        let pos = SourcePosition::from_offset(text, 999);
        assert_eq!(pos.offset, text.len());
        assert_eq!(pos.line, 3);
    }

    #[test]
    fn test_report_counts_errors_only() {
        let report = BuildReport::new(vec![
            BuildDiagnostic::error(DiagnosticKind::ReadFailure, "missing a.js"),
            BuildDiagnostic::warning(DiagnosticKind::SyntaxError, "lazy chunk broken"),
            BuildDiagnostic::error(DiagnosticKind::UnresolvedBareSpecifier, "react"),
        ]);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warnings().count(), 1);
        assert!(report.to_string().starts_with("2 errors"));
    }
}
