//! Punctuation and operator vocabulary.
//!
//! This module defines the canonical set of punctuation tokens used by the lexer/parser: delimiters, separators,
//! access markers, and binary operators (with their binding power).
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - This module is vocabulary only (spellings + metadata). It does not tokenize source text.
//! - The lexer matches the longest spelling first; see [`by_length_desc`].
//!
//! ## Examples
//! ```rust
//! use quill_core::lang::punctuation::{self, PunctuationId};
//!
//! assert_eq!(punctuation::from_str("->"), Some(PunctuationId::Arrow));
//! assert_eq!(punctuation::as_str(PunctuationId::Pipe), "|>");
//! ```

use super::features::FeatureId;
use super::registry::{Since, Stability};

/// Broad syntactic grouping for punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationCategory {
    /// Brackets and braces.
    Delimiter,
    /// Separators like `,` and `;`.
    Separator,
    /// Access markers like `.` and `->`.
    Access,
    /// Binary/unary operators.
    Operator,
}

/// Stable identifier for punctuation tokens.
///
/// ## Notes
/// - The discriminant order matches [`PUNCTUATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationId {
    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Separators
    Comma,
    Colon,
    Semicolon,

    // Access
    Dot,
    Arrow,

    // Operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Pipe,
}

/// Metadata for a punctuation token.
#[derive(Debug, Clone, Copy)]
pub struct PunctuationInfo {
    pub id: PunctuationId,
    pub canonical: &'static str,
    pub category: PunctuationCategory,
    /// Binding power when used as a binary operator (higher binds tighter).
    pub binary_precedence: Option<u8>,
    pub since: Since,
    pub stability: Stability,
    pub gated_by: Option<FeatureId>,
}

/// Registry of all punctuation tokens.
pub const PUNCTUATION: &[PunctuationInfo] = &[
    // Delimiters
    info(PunctuationId::LParen, "(", PunctuationCategory::Delimiter),
    info(PunctuationId::RParen, ")", PunctuationCategory::Delimiter),
    info(PunctuationId::LBrace, "{", PunctuationCategory::Delimiter),
    info(PunctuationId::RBrace, "}", PunctuationCategory::Delimiter),
    info(PunctuationId::LBracket, "[", PunctuationCategory::Delimiter),
    info(PunctuationId::RBracket, "]", PunctuationCategory::Delimiter),
    // Separators
    info(PunctuationId::Comma, ",", PunctuationCategory::Separator),
    info(PunctuationId::Colon, ":", PunctuationCategory::Separator),
    info(PunctuationId::Semicolon, ";", PunctuationCategory::Separator),
    // Access
    info(PunctuationId::Dot, ".", PunctuationCategory::Access),
    info(PunctuationId::Arrow, "->", PunctuationCategory::Access),
    // Operators
    info(PunctuationId::Assign, "=", PunctuationCategory::Operator),
    binary(PunctuationId::Plus, "+", 5),
    binary(PunctuationId::Minus, "-", 5),
    binary(PunctuationId::Star, "*", 6),
    binary(PunctuationId::Slash, "/", 6),
    binary(PunctuationId::EqEq, "==", 4),
    binary(PunctuationId::NotEq, "!=", 4),
    binary(PunctuationId::Lt, "<", 4),
    binary(PunctuationId::LtEq, "<=", 4),
    binary(PunctuationId::Gt, ">", 4),
    binary(PunctuationId::GtEq, ">=", 4),
    binary(PunctuationId::AndAnd, "&&", 3),
    binary(PunctuationId::OrOr, "||", 2),
    info(PunctuationId::Bang, "!", PunctuationCategory::Operator),
    PunctuationInfo {
        id: PunctuationId::Pipe,
        canonical: "|>",
        category: PunctuationCategory::Operator,
        binary_precedence: Some(1),
        since: Since(0, 2),
        stability: Stability::Experimental,
        gated_by: Some(FeatureId::PipelineOperator),
    },
];

/// Return the canonical spelling for a punctuation token.
pub fn as_str(id: PunctuationId) -> &'static str {
    info_for(id).canonical
}

/// Return the category for a punctuation token.
pub fn category(id: PunctuationId) -> PunctuationCategory {
    info_for(id).category
}

/// Return the binary-operator binding power, if `id` is a binary operator.
pub fn binary_precedence(id: PunctuationId) -> Option<u8> {
    info_for(id).binary_precedence
}

/// Return the full metadata entry for a punctuation token.
pub fn info_for(id: PunctuationId) -> &'static PunctuationInfo {
    &PUNCTUATION[id as usize]
}

/// Resolve a punctuation spelling to its identifier.
pub fn from_str(s: &str) -> Option<PunctuationId> {
    PUNCTUATION.iter().find(|p| p.canonical == s).map(|p| p.id)
}

/// Iterate the registry with longer spellings first, for maximal-munch tokenization.
pub fn by_length_desc() -> impl Iterator<Item = &'static PunctuationInfo> {
    let mut entries: Vec<&'static PunctuationInfo> = PUNCTUATION.iter().collect();
    entries.sort_by(|a, b| b.canonical.len().cmp(&a.canonical.len()));
    entries.into_iter()
}

const fn info(id: PunctuationId, canonical: &'static str, category: PunctuationCategory) -> PunctuationInfo {
    PunctuationInfo {
        id,
        canonical,
        category,
        binary_precedence: None,
        since: Since(0, 1),
        stability: Stability::Stable,
        gated_by: None,
    }
}

const fn binary(id: PunctuationId, canonical: &'static str, precedence: u8) -> PunctuationInfo {
    PunctuationInfo {
        id,
        canonical,
        category: PunctuationCategory::Operator,
        binary_precedence: Some(precedence),
        since: Since(0, 1),
        stability: Stability::Stable,
        gated_by: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_discriminants() {
        for (i, p) in PUNCTUATION.iter().enumerate() {
            assert_eq!(p.id as usize, i, "PUNCTUATION[{i}] is out of order ({:?})", p.id);
        }
    }

    #[test]
    fn test_spellings_are_unique() {
        for (i, a) in PUNCTUATION.iter().enumerate() {
            for b in &PUNCTUATION[i + 1..] {
                assert_ne!(a.canonical, b.canonical);
            }
        }
    }

    #[test]
    fn test_longest_spellings_come_first() {
        let lengths: Vec<usize> = by_length_desc().map(|p| p.canonical.len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_pipe_binds_loosest() {
        let pipe = binary_precedence(PunctuationId::Pipe).unwrap();
        for p in PUNCTUATION {
            if let Some(prec) = p.binary_precedence {
                assert!(prec >= pipe);
            }
        }
    }
}
