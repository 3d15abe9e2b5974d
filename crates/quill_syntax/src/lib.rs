//! Lossless syntax frontend for the Quill language: buffer view, lexer, syntax tree, parser, diagnostics.
//!
//! This crate is dependency-light and intended for reuse by the compiler driver, the host parse bridge, and
//! tooling.
//!
//! ## Notes
//! - This crate is "syntax-only": it does not do name resolution or type checking.
//! - Parsing is **lossless**: every byte of the input belongs to exactly one token of the tree, so re-serializing
//!   the tree reproduces the input byte-for-byte (including invalid bytes and editor placeholders).
//! - Parsing never fails. Problems are reported as [`diagnostics::Diagnostic`] values anchored to tree nodes.
//!
//! ## Examples
//! ```rust
//! use quill_core::lang::features::ExperimentalFeatures;
//! use quill_syntax::parser;
//!
//! let source = b"import Foundation\nfunc main() { print(1) }\n";
//! let parse = parser::parse(source, ExperimentalFeatures::empty());
//! assert!(parse.diagnostics().is_empty());
//! assert_eq!(parse.tree().text(source), source.to_vec());
//! ```

pub mod buffer;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use buffer::{LineColumn, LineTable, SourceBuffer, SourceLoc, Span};
