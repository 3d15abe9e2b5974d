//! Feature-gated, error-recovering parser for the Quill language.
//!
//! Builds a lossless [`SyntaxTree`] from the token stream. The grammar covers imports, functions, bindings,
//! conditional-compilation blocks, statements and a precedence-climbing expression grammar. Experimental
//! productions (see `quill_core::lang::features`) are always parsed, so the tree stays lossless, but each one is
//! diagnosed unless its feature is enabled.
//!
//! ## Examples
//!
//! ```rust
//! use quill_core::lang::features::ExperimentalFeatures;
//! use quill_syntax::parser;
//!
//! let parse = parser::parse(b"let x = do { 1 }\n", ExperimentalFeatures::empty());
//! assert_eq!(parse.diagnostics().len(), 1);
//! let parse = parser::parse(b"let x = do { 1 }\n", ExperimentalFeatures::DO_EXPRESSIONS);
//! assert!(parse.diagnostics().is_empty());
//! ```

use crate::buffer::Span;
use crate::diagnostics::{Diagnostic, errors};
use crate::lexer::{self, Lexed, Token, TokenKind};
use crate::tree::{SyntaxKind, SyntaxTree, TreeBuilder};
use quill_core::lang::features::{self, ExperimentalFeatures, FeatureId};
use quill_core::lang::keywords::KeywordId;
use quill_core::lang::punctuation::{self, PunctuationId};

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/util.rs");
include!("parser/decl.rs");
include!("parser/stmts.rs");
include!("parser/expr.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
