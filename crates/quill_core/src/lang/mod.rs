//! Quill language vocabulary registries.
//!
//! This module is the "front door" for language-level vocabulary: reserved keywords, punctuation/operators, and
//! experimental features.
//!
//! The design goal is to avoid stringly-typed checks scattered across the lexer/parser/driver. Callers work with
//! **stable IDs** (e.g. `KeywordId`, `PunctuationId`, `FeatureId`) and look up spellings/metadata via registry tables.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no syntax-tree types, no IO, no side effects.
//! - The lexer/parser enforce syntax; registries provide spellings and metadata for shared use (diagnostics, CLI
//!   help, feature queries).
//!
//! ## Examples
//! ```rust
//! use quill_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("func"), Some(KeywordId::Func));
//! assert_eq!(keywords::as_str(KeywordId::Func), "func");
//! ```

pub mod features;
pub mod keywords;
pub mod punctuation;
pub mod registry;
