//! Syntax diagnostics.
//!
//! Diagnostics are values, never early exits: the lexer and parser record them and carry on. Each diagnostic that
//! originates in the tree is anchored to the node that was being built when the problem was found, so consumers can
//! reason about *where in the tree* it came from (e.g. inside a conditional-compilation block).

use crate::buffer::Span;
use crate::tree::NodeId;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable identity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticId {
    // Lexical
    UnterminatedString,
    UnterminatedComment,
    UnterminatedPlaceholder,
    InvalidCharacter,
    UnknownDirective,

    // Syntactic
    ExpectedToken,
    ExpectedExpression,
    ExpectedDeclaration,
    UnterminatedIfConfig,
    NestingTooDeep,
    EditorPlaceholder,
    ExperimentalFeatureDisabled,

    // Dependency scanning
    ForeignDependencyScanError,
    DependencyCycle,
    DependencyCacheLoadFailed,
}

impl DiagnosticId {
    /// Short stable code, e.g. for machine-readable output.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticId::UnterminatedString => "Q0001",
            DiagnosticId::UnterminatedComment => "Q0002",
            DiagnosticId::UnterminatedPlaceholder => "Q0003",
            DiagnosticId::InvalidCharacter => "Q0004",
            DiagnosticId::UnknownDirective => "Q0005",
            DiagnosticId::ExpectedToken => "Q0100",
            DiagnosticId::ExpectedExpression => "Q0101",
            DiagnosticId::ExpectedDeclaration => "Q0102",
            DiagnosticId::UnterminatedIfConfig => "Q0103",
            DiagnosticId::NestingTooDeep => "Q0104",
            DiagnosticId::EditorPlaceholder => "Q0105",
            DiagnosticId::ExperimentalFeatureDisabled => "Q0106",
            DiagnosticId::ForeignDependencyScanError => "Q0200",
            DiagnosticId::DependencyCycle => "Q0201",
            DiagnosticId::DependencyCacheLoadFailed => "Q0202",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticId::DependencyCacheLoadFailed => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A diagnostic with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// Tree node the diagnostic originated in, if it came from the tree.
    pub node: Option<NodeId>,
}

impl Diagnostic {
    pub fn new(id: DiagnosticId, message: impl Into<String>, span: Span) -> Self {
        Self {
            id,
            severity: id.default_severity(),
            message: message.into(),
            span,
            node: None,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Constructors for common diagnostics, so message wording stays in one place.
pub mod errors {
    use super::*;

    pub fn expected_token(expected: &str, span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticId::ExpectedToken, format!("expected {expected}"), span)
    }

    pub fn expected_expression(span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticId::ExpectedExpression, "expected expression", span)
    }

    pub fn expected_declaration(found: &str, span: Span) -> Diagnostic {
        Diagnostic::new(
            DiagnosticId::ExpectedDeclaration,
            format!("expected declaration or statement, found {found}"),
            span,
        )
    }

    pub fn editor_placeholder(span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticId::EditorPlaceholder, "editor placeholder in source file", span)
    }

    pub fn feature_disabled(construct: &str, feature: &str, span: Span) -> Diagnostic {
        Diagnostic::new(
            DiagnosticId::ExperimentalFeatureDisabled,
            format!("unrecognized construct: {construct} requires experimental feature '{feature}'"),
            span,
        )
    }

    pub fn unterminated_if_config(span: Span) -> Diagnostic {
        Diagnostic::new(
            DiagnosticId::UnterminatedIfConfig,
            "expected #endif in conditional compilation block",
            span,
        )
    }

    pub fn nesting_too_deep(span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticId::NestingTooDeep, "nesting is too deep", span)
    }
}
