//! Token types for the Quill lexer.
//!
//! Tokens carry no text, only a [`Span`]. Text is always read back from the source buffer, which is what makes the
//! token stream (and the tree built from it) lossless.

use crate::buffer::Span;
use quill_core::lang::keywords::{self, KeywordId};
use quill_core::lang::punctuation::PunctuationId;

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ========== Registry-backed ==========
    Keyword(KeywordId),
    Punctuation(PunctuationId),

    // ========== Identifiers and literals ==========
    Ident,
    Int,
    String,
    /// `<#name#>` editor placeholder.
    Placeholder,

    // ========== Conditional compilation ==========
    PoundIf,
    PoundElseIf,
    PoundElse,
    PoundEndIf,

    // ========== Trivia ==========
    Whitespace,
    Newline,
    LineComment,
    BlockComment,

    // ========== Special ==========
    /// Bytes the lexer could not classify.
    Unknown,
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_keyword(self, id: KeywordId) -> bool {
        self == TokenKind::Keyword(id)
    }

    pub fn is_punctuation(self, id: PunctuationId) -> bool {
        self == TokenKind::Punctuation(id)
    }

    pub fn is_directive(self) -> bool {
        matches!(
            self,
            TokenKind::PoundIf | TokenKind::PoundElseIf | TokenKind::PoundElse | TokenKind::PoundEndIf
        )
    }

    /// Human-readable description for "expected X, found Y" messages.
    pub fn describe(self) -> String {
        match self {
            TokenKind::Keyword(id) => format!("'{}'", keywords::as_str(id)),
            TokenKind::Punctuation(id) => format!("'{}'", quill_core::lang::punctuation::as_str(id)),
            TokenKind::Ident => "identifier".to_string(),
            TokenKind::Int => "integer literal".to_string(),
            TokenKind::String => "string literal".to_string(),
            TokenKind::Placeholder => "editor placeholder".to_string(),
            TokenKind::PoundIf => "'#if'".to_string(),
            TokenKind::PoundElseIf => "'#elseif'".to_string(),
            TokenKind::PoundElse => "'#else'".to_string(),
            TokenKind::PoundEndIf => "'#endif'".to_string(),
            TokenKind::Whitespace | TokenKind::Newline => "whitespace".to_string(),
            TokenKind::LineComment | TokenKind::BlockComment => "comment".to_string(),
            TokenKind::Unknown => "unrecognized input".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Resolve an identifier spelling to a keyword id, if reserved.
pub fn keyword_id(spelling: &[u8]) -> Option<KeywordId> {
    std::str::from_utf8(spelling).ok().and_then(keywords::from_str)
}

/// Resolve a directive name (without `#`) to its token kind.
pub fn directive_kind(name: &[u8]) -> Option<TokenKind> {
    match name {
        b"if" => Some(TokenKind::PoundIf),
        b"elseif" => Some(TokenKind::PoundElseIf),
        b"else" => Some(TokenKind::PoundElse),
        b"endif" => Some(TokenKind::PoundEndIf),
        _ => None,
    }
}
