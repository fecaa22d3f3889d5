//! miette rendering of [`BuildDiagnostic`]s.
//!
//! A [`DiagnosticError`] carries the diagnostic plus, when the module text is
//! available, the source it points into, so fancy reports can underline the
//! offending specifier.

use std::fmt;

use kiln_graph::{BuildDiagnostic, DiagnosticKind, ModuleGraph, Severity};
use miette::{Diagnostic, LabeledSpan, NamedSource};

#[derive(Debug)]
pub struct DiagnosticError {
    diagnostic: BuildDiagnostic,
    source: Option<NamedSource<String>>,
}

impl DiagnosticError {
    pub fn new(diagnostic: BuildDiagnostic) -> Self {
        Self {
            diagnostic,
            source: None,
        }
    }

    pub fn with_source(mut self, name: impl AsRef<str>, text: impl Into<String>) -> Self {
        self.source = Some(NamedSource::new(name, text.into()));
        self
    }

    pub fn diagnostic(&self) -> &BuildDiagnostic {
        &self.diagnostic
    }

    /// Width of the label: the specifier when it sits at the offset, one
    /// character otherwise.
    fn label_len(&self, text: &str, offset: usize) -> usize {
        let rest = text.get(offset..).unwrap_or_default();
        match &self.diagnostic.specifier {
            Some(specifier) if rest.starts_with(specifier.as_str()) => specifier.len(),
            _ => rest.chars().next().map_or(0, char::len_utf8),
        }
    }
}

impl std::error::Error for DiagnosticError {}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl Diagnostic for DiagnosticError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diagnostic.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let mut help = help_for(self.diagnostic.kind).map(str::to_string);
        if self.diagnostic.chain.len() > 1 {
            let chain = self
                .diagnostic
                .chain
                .iter()
                .map(|url| url.path().rsplit('/').next().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" -> ");
            help = Some(match help {
                Some(text) => format!("{text}\nimported via {chain}"),
                None => format!("imported via {chain}"),
            });
        }
        help.map(|text| Box::new(text) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source.as_ref().map(|source| source as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let source = self.source.as_ref()?;
        let position = self.diagnostic.position?;
        let length = self.label_len(source.inner(), position.offset);
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(label_for(self.diagnostic.kind).to_string()),
            position.offset,
            length,
        ))))
    }
}

fn label_for(kind: DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::UnresolvedBareSpecifier => "not in the import map",
        DiagnosticKind::InvalidSpecifier => "invalid specifier",
        DiagnosticKind::SyntaxError => "syntax error",
        DiagnosticKind::ReadFailure => "could not be read",
        DiagnosticKind::MissingExport => "not exported by the target",
        _ => "here",
    }
}

fn help_for(kind: DiagnosticKind) -> Option<&'static str> {
    match kind {
        DiagnosticKind::UnresolvedBareSpecifier => {
            Some("add the specifier to the import map, or use a relative path")
        }
        DiagnosticKind::CycleWithoutVersionPolicy => {
            Some("set versioning.cycles to \"seed-with-raw-hash\" to allow import cycles")
        }
        DiagnosticKind::UnreachableEntryPoint => Some("check the entry paths in the config"),
        _ => None,
    }
}

/// Wrap `diagnostic`, attaching the text of the module it points into when
/// `graph` has it.
pub fn to_diagnostic_error(diagnostic: BuildDiagnostic, graph: Option<&ModuleGraph>) -> DiagnosticError {
    let source = diagnostic.url.as_ref().and_then(|url| {
        let node = graph?.node(url)?;
        Some((url.to_string(), node.text()?.to_string()))
    });
    let error = DiagnosticError::new(diagnostic);
    match source {
        Some((name, text)) => error.with_source(name, text),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::SourcePosition;

    #[test]
    fn test_label_covers_specifier() {
        let text = "import x from 'lodash';\n";
        let diagnostic = BuildDiagnostic::error(
            DiagnosticKind::UnresolvedBareSpecifier,
            "Bare specifier 'lodash' is not in the import map",
        )
        .with_specifier("lodash")
        .with_position(Some(SourcePosition::from_offset(text, 15)));
        let error = DiagnosticError::new(diagnostic).with_source("main.js", text);

        let labels: Vec<_> = error.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 15);
        assert_eq!(labels[0].len(), "lodash".len());
        assert_eq!(
            error.code().unwrap().to_string(),
            "kiln::unresolved_bare_specifier"
        );
        assert!(error.help().is_some());
    }

    #[test]
    fn test_no_labels_without_source() {
        let diagnostic = BuildDiagnostic::warning(DiagnosticKind::ReadFailure, "gone")
            .with_position(Some(SourcePosition {
                line: 1,
                column: 1,
                offset: 0,
            }));
        let error = DiagnosticError::new(diagnostic);
        assert!(error.labels().is_none());
        assert_eq!(error.severity(), Some(miette::Severity::Warning));
    }
}
