//! Projection of parser diagnostics onto a host-owned sink.
//!
//! ## Rules
//!
//! 1. A diagnostic whose node lies inside an `#if` block is dropped. The parser cannot tell which clause is active,
//!    so every clause is treated as possibly inactive.
//! 2. With `downgrade_placeholder_errors`, editor placeholder errors become warnings.
//! 3. With `emit_only_errors`, anything that is not an error is dropped.
//!
//! Projection is a pure function of the file and the policy: iterating twice yields the same diagnostics.

use quill_syntax::diagnostics::{Diagnostic, DiagnosticId, Severity};

use super::{ExportedSourceFile, SourceRange};

/// Which diagnostics reach the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticPolicy {
    pub emit_only_errors: bool,
    pub downgrade_placeholder_errors: bool,
}

impl DiagnosticPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emit_only_errors(mut self, enabled: bool) -> Self {
        self.emit_only_errors = enabled;
        self
    }

    pub fn with_downgrade_placeholder_errors(mut self, enabled: bool) -> Self {
        self.downgrade_placeholder_errors = enabled;
        self
    }
}

/// A diagnostic as the host receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedDiagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub message: String,
    pub range: SourceRange,
}

/// Host-owned receiver of projected diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: ProjectedDiagnostic);
}

impl DiagnosticSink for Vec<ProjectedDiagnostic> {
    fn emit(&mut self, diagnostic: ProjectedDiagnostic) {
        self.push(diagnostic);
    }
}

impl<'buf> ExportedSourceFile<'buf> {
    /// Projected diagnostics, in source order. Computed lazily; call again to restart.
    pub fn diagnostics(&self, policy: DiagnosticPolicy) -> impl Iterator<Item = ProjectedDiagnostic> + '_ {
        self.diagnostics
            .iter()
            .filter_map(move |diagnostic| self.project(diagnostic, policy))
    }

    fn project(&self, diagnostic: &Diagnostic, policy: DiagnosticPolicy) -> Option<ProjectedDiagnostic> {
        if diagnostic
            .node
            .is_some_and(|node| self.tree.is_in_conditional_region(node))
        {
            return None;
        }
        let mut severity = diagnostic.severity;
        if policy.downgrade_placeholder_errors
            && diagnostic.id == DiagnosticId::EditorPlaceholder
            && severity == Severity::Error
        {
            severity = Severity::Warning;
        }
        if policy.emit_only_errors && severity != Severity::Error {
            return None;
        }
        Some(ProjectedDiagnostic {
            id: diagnostic.id,
            severity,
            message: diagnostic.message.clone(),
            range: self.source_range(diagnostic.span),
        })
    }
}

/// Forward the projected diagnostics of `file` to `sink`. Returns whether any were emitted.
#[tracing::instrument(skip_all, fields(file = file.file_name()))]
pub fn emit_parser_diagnostics(
    file: &ExportedSourceFile<'_>,
    sink: &mut dyn DiagnosticSink,
    policy: DiagnosticPolicy,
) -> bool {
    let mut emitted = false;
    for diagnostic in file.diagnostics(policy) {
        sink.emit(diagnostic);
        emitted = true;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::parse_source_file;

    #[test]
    fn test_placeholder_downgrade_and_errors_only() {
        let source = b"let x = <#value#>\n";
        let file = parse_source_file(source, "M", "m.qd", None).unwrap();

        let all: Vec<_> = file.diagnostics(DiagnosticPolicy::new()).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].severity, Severity::Error);

        let downgraded = DiagnosticPolicy::new().with_downgrade_placeholder_errors(true);
        let warnings: Vec<_> = file.diagnostics(downgraded).collect();
        assert_eq!(warnings[0].severity, Severity::Warning);
        assert_eq!(warnings[0].range.start.column, 9);

        let mut sink: Vec<ProjectedDiagnostic> = Vec::new();
        assert!(!emit_parser_diagnostics(&file, &mut sink, downgraded.with_emit_only_errors(true)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_conditional_region_suppresses_everything() {
        let source = b"#if DEBUG\nlet = \n#else\nlet y = <#v#>\n#endif\nlet z = )\n";
        let file = parse_source_file(source, "M", "m.qd", None).unwrap();
        assert!(file.syntax_diagnostics().len() >= 3);

        let mut sink: Vec<ProjectedDiagnostic> = Vec::new();
        assert!(emit_parser_diagnostics(&file, &mut sink, DiagnosticPolicy::new()));
        // Only the error after `#endif` survives.
        assert!(!sink.is_empty());
        assert!(sink.iter().all(|d| d.range.start.line == 6), "{sink:?}");
    }
}
