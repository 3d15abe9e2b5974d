//! Lossless lexer for the Quill programming language.
//!
//! Handles tokenization including:
//! - Keywords and identifiers (ASCII), integer and string literals
//! - Punctuation and operators (maximal munch over the registry)
//! - Conditional-compilation directives (`#if`, `#elseif`, `#else`, `#endif`)
//! - Editor placeholders (`<#name#>`)
//! - Trivia: whitespace, newlines, `//` and `/* */` comments
//!
//! ## Notes
//! - The lexer works on bytes. Every input byte ends up in exactly one token; bytes it cannot classify (including
//!   non-ASCII bytes outside literals and comments) become `Unknown` tokens plus a diagnostic.
//! - Lexing never fails: diagnostics are returned alongside the tokens.

pub mod tokens;

pub use tokens::{Token, TokenKind, directive_kind, keyword_id};

use crate::buffer::Span;
use crate::diagnostics::{Diagnostic, DiagnosticId};
use quill_core::lang::punctuation;

/// Output of lexing: the complete token stream (ending in `Eof`) and any lexical diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lexer for Quill source bytes.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the entire input. The token stream always ends with an `Eof` token.
    pub fn tokenize(mut self) -> Lexed {
        while self.pos < self.source.len() {
            self.scan_token();
        }
        let end = self.pos as u32;
        self.tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
        Lexed {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    // ========================================================================
    // Core byte handling
    // ========================================================================

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.source.get(self.pos + n).copied()
    }

    fn rest(&self) -> &'a [u8] {
        &self.source[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start as u32, self.pos as u32)));
    }

    fn error(&mut self, id: DiagnosticId, message: impl Into<String>, start: usize) {
        self.diagnostics
            .push(Diagnostic::new(id, message, Span::new(start as u32, self.pos as u32)));
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let Some(b) = self.peek_at(0) else {
            return;
        };

        match b {
            b' ' | b'\t' | b'\r' | 0x0c => {
                while matches!(self.peek_at(0), Some(b' ' | b'\t' | b'\r' | 0x0c)) {
                    self.pos += 1;
                }
                self.push(TokenKind::Whitespace, start);
            }
            b'\n' => {
                self.pos += 1;
                self.push(TokenKind::Newline, start);
            }
            b'/' if self.peek_at(1) == Some(b'/') => self.scan_line_comment(start),
            b'/' if self.peek_at(1) == Some(b'*') => self.scan_block_comment(start),
            b'"' => self.scan_string(start),
            b'<' if self.peek_at(1) == Some(b'#') => self.scan_placeholder(start),
            b'#' => self.scan_directive(start),
            b'0'..=b'9' => {
                while matches!(self.peek_at(0), Some(b'0'..=b'9' | b'_')) {
                    self.pos += 1;
                }
                self.push(TokenKind::Int, start);
            }
            b if is_ident_start(b) => self.scan_identifier(start),
            _ => {
                if !self.scan_punctuation(start) {
                    self.scan_unknown(start);
                }
            }
        }
    }

    fn scan_line_comment(&mut self, start: usize) {
        while !matches!(self.peek_at(0), None | Some(b'\n')) {
            self.pos += 1;
        }
        self.push(TokenKind::LineComment, start);
    }

    fn scan_block_comment(&mut self, start: usize) {
        self.pos += 2;
        loop {
            match self.peek_at(0) {
                None => {
                    self.error(DiagnosticId::UnterminatedComment, "unterminated block comment", start);
                    break;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.pos += 2;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::BlockComment, start);
    }

    fn scan_string(&mut self, start: usize) {
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => {
                    self.error(DiagnosticId::UnterminatedString, "unterminated string literal", start);
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') if !matches!(self.peek_at(1), None | Some(b'\n')) => self.pos += 2,
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::String, start);
    }

    fn scan_placeholder(&mut self, start: usize) {
        let line_end = self
            .rest()
            .iter()
            .position(|b| *b == b'\n')
            .unwrap_or(self.rest().len());
        let line = &self.rest()[..line_end];
        match line.windows(2).skip(2).position(|w| w == b"#>") {
            Some(close) => {
                self.pos += close + 4;
                self.push(TokenKind::Placeholder, start);
            }
            None => {
                self.pos += line_end;
                self.error(
                    DiagnosticId::UnterminatedPlaceholder,
                    "unterminated editor placeholder",
                    start,
                );
                self.push(TokenKind::Unknown, start);
            }
        }
    }

    fn scan_directive(&mut self, start: usize) {
        self.pos += 1;
        while self.peek_at(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let name = &self.source[start + 1..self.pos];
        match directive_kind(name) {
            Some(kind) => self.push(kind, start),
            None if name.is_empty() => {
                self.error(DiagnosticId::InvalidCharacter, "invalid character '#'", start);
                self.push(TokenKind::Unknown, start);
            }
            None => {
                let message = format!("unknown directive '#{}'", String::from_utf8_lossy(name));
                self.error(DiagnosticId::UnknownDirective, message, start);
                self.push(TokenKind::Unknown, start);
            }
        }
    }

    fn scan_identifier(&mut self, start: usize) {
        while self.peek_at(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let spelling = &self.source[start..self.pos];
        match keyword_id(spelling) {
            Some(id) => self.push(TokenKind::Keyword(id), start),
            None => self.push(TokenKind::Ident, start),
        }
    }

    fn scan_punctuation(&mut self, start: usize) -> bool {
        let rest = self.rest();
        let Some(matched) = punctuation::by_length_desc().find(|p| rest.starts_with(p.canonical.as_bytes())) else {
            return false;
        };
        self.pos += matched.canonical.len();
        self.push(TokenKind::Punctuation(matched.id), start);
        true
    }

    fn scan_unknown(&mut self, start: usize) {
        let first = self.source[start];
        self.pos += 1;
        if first >= 0x80 {
            while self.peek_at(0).is_some_and(|b| b >= 0x80) {
                self.pos += 1;
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        self.error(
            DiagnosticId::InvalidCharacter,
            format!("invalid character {:?}", text),
            start,
        );
        self.push(TokenKind::Unknown, start);
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if a byte can start an identifier (ASCII-only).
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Check if a byte can continue an identifier (ASCII-only).
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Convenience function to lex source bytes.
///
/// This is a shorthand for `Lexer::new(source).tokenize()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &[u8]) -> Lexed {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================
