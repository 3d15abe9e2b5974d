//! Human-readable diagnostics.
//!
//! Parser diagnostics are rendered as miette reports with the offending span labeled in the source. Scan
//! diagnostics have no location and render as a bare report.

use std::fmt;

use miette::{LabeledSpan, NamedSource, SourceCode, SourceSpan};
use quill_syntax::diagnostics::{DiagnosticId, Severity};

use crate::bridge::{ExportedSourceFile, ProjectedDiagnostic};
use crate::dependencies::ScanDiagnostic;

/// A diagnostic in the shape miette renders.
#[derive(Debug)]
struct Report {
    message: String,
    id: DiagnosticId,
    severity: Severity,
    source: Option<NamedSource<String>>,
    span: Option<SourceSpan>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Report {}

impl miette::Diagnostic for Report {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.id.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Note => miette::Severity::Advice,
            Severity::Warning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        })
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.source.as_ref().map(|source| source as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(None, span))))
    }
}

fn render(report: Report) -> String {
    format!("{:?}", miette::Report::new(report))
}

/// Render a parser diagnostic against the file it came from. Files that are not valid UTF-8 render without a
/// source snippet.
pub fn render_projected(file: &ExportedSourceFile<'_>, diagnostic: &ProjectedDiagnostic) -> String {
    let text = std::str::from_utf8(file.buffer().bytes()).ok();
    let span = diagnostic.range.span;
    let message = match text {
        Some(_) => diagnostic.message.clone(),
        None => format!(
            "{}:{}:{}: {}",
            file.file_name(),
            diagnostic.range.start.line,
            diagnostic.range.start.column,
            diagnostic.message
        ),
    };
    render(Report {
        message,
        id: diagnostic.id,
        severity: diagnostic.severity,
        source: text.map(|text| NamedSource::new(file.file_name(), text.to_string())),
        span: text.map(|_| SourceSpan::from((span.start as usize, span.len() as usize))),
    })
}

pub fn render_scan(diagnostic: &ScanDiagnostic) -> String {
    render(Report {
        message: diagnostic.message.clone(),
        id: diagnostic.id,
        severity: diagnostic.severity,
        source: None,
        span: None,
    })
}
