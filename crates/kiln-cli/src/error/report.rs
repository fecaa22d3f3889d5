//! Conversion from CLI errors to miette reports.

#![allow(clippy::disallowed_methods)]

use kiln_build::{BuildDiagnostic, BuildReport, DiagnosticError, to_diagnostic_error};
use miette::{Diagnostic, Report};
use thiserror::Error;

use crate::error::CliError;

/// Every error of a failed build, rendered as related diagnostics.
#[derive(Debug, Error, Diagnostic)]
#[error("Build failed with {count} error(s)")]
#[diagnostic(code(kiln::build))]
struct BuildFailed {
    count: usize,
    #[related]
    related: Vec<DiagnosticError>,
}

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(kiln_build::Error::Build(report)) => report_to_miette(&report),
        CliError::Build(e) => Report::new(e),
        other => miette::miette!("{}", other),
    }
}

fn report_to_miette(report: &BuildReport) -> Report {
    let related: Vec<_> = report.errors().cloned().map(with_source).collect();
    Report::new(BuildFailed {
        count: related.len(),
        related,
    })
}

/// Attach the file's text when the diagnostic points at a local file.
pub fn with_source(diagnostic: BuildDiagnostic) -> DiagnosticError {
    let source = diagnostic
        .url
        .as_ref()
        .filter(|_| diagnostic.position.is_some())
        .and_then(|url| url.to_file_path().ok())
        .and_then(|path| {
            let text = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), text))
        });

    let error = to_diagnostic_error(diagnostic, None);
    match source {
        Some((name, text)) => error.with_source(name, text),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_build::DiagnosticKind;
    use kiln_build::kiln_graph::{SourcePosition, url::Url};
    use std::io::Write;

    #[test]
    fn test_source_is_loaded_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "import 'lodash';").unwrap();
        let url = url_of(file.path());

        let mut diagnostic = BuildDiagnostic::error(
            DiagnosticKind::UnresolvedBareSpecifier,
            "cannot resolve 'lodash'",
        );
        diagnostic.url = Some(url);
        diagnostic.specifier = Some("lodash".into());
        diagnostic.position = Some(SourcePosition::from_offset("import 'lodash';\n", 8));

        let error = with_source(diagnostic);
        assert!(error.source_code().is_some());
        assert_eq!(error.labels().map(|labels| labels.count()), Some(1));
    }

    #[test]
    fn test_build_report_lists_each_error() {
        let report = BuildReport::new(vec![
            BuildDiagnostic::error(DiagnosticKind::UnresolvedBareSpecifier, "a"),
            BuildDiagnostic::error(DiagnosticKind::SyntaxError, "b"),
        ]);
        let rendered = cli_error_to_miette(CliError::Build(kiln_build::Error::Build(report)));
        assert_eq!(rendered.to_string(), "Build failed with 2 error(s)");
        assert_eq!(rendered.related().map(|r| r.count()), Some(2));
    }

    fn url_of(path: &std::path::Path) -> Url {
        Url::from_file_path(path).unwrap()
    }
}
