/// Token navigation and diagnostic helpers shared by the grammar chunks.
impl Parser {
    /// Index of the `n`-th significant (non-trivia) token at or after `pos`. Saturates at `Eof`.
    fn nth_index(&self, n: usize) -> usize {
        let mut seen = 0;
        let mut idx = self.pos;
        while idx < self.tokens.len() {
            let kind = self.tokens[idx].kind;
            if kind == TokenKind::Eof {
                return idx;
            }
            if !kind.is_trivia() {
                if seen == n {
                    return idx;
                }
                seen += 1;
            }
            idx += 1;
        }
        self.tokens.len().saturating_sub(1)
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.nth_index(n))
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn current(&self) -> TokenKind {
        self.nth(0)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.nth_index(0))
            .map_or(Span::default(), |t| t.span)
    }

    fn at_eof(&self) -> bool {
        self.current() == TokenKind::Eof
    }

    fn at_punct(&self, id: PunctuationId) -> bool {
        self.current().is_punctuation(id)
    }

    fn at_keyword(&self, id: KeywordId) -> bool {
        self.current().is_keyword(id)
    }

    /// Whether a newline separates the previous significant token from the next one.
    fn at_line_break(&self) -> bool {
        let next = self.nth_index(0).max(self.pos);
        self.tokens[self.pos..next]
            .iter()
            .any(|t| t.kind == TokenKind::Newline)
            || self.at_eof()
    }

    /// Tokens where error recovery stops skipping and lets an enclosing construct take over.
    fn at_recovery_point(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::Eof
                | TokenKind::PoundIf
                | TokenKind::PoundElseIf
                | TokenKind::PoundElse
                | TokenKind::PoundEndIf
                | TokenKind::Punctuation(PunctuationId::RBrace)
                | TokenKind::Punctuation(PunctuationId::Semicolon)
                | TokenKind::Keyword(KeywordId::Func)
                | TokenKind::Keyword(KeywordId::Import)
                | TokenKind::Keyword(KeywordId::Let)
                | TokenKind::Keyword(KeywordId::Var)
                | TokenKind::Keyword(KeywordId::Macro)
        )
    }

    fn bump_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.builder.token(self.pos as u32);
            self.pos += 1;
        }
    }

    /// Attach pending trivia and the next significant token to the current node. `Eof` is never consumed here.
    fn bump(&mut self) {
        self.bump_trivia();
        if self.pos < self.tokens.len() && self.tokens[self.pos].kind != TokenKind::Eof {
            self.builder.token(self.pos as u32);
            self.pos += 1;
        }
    }

    fn eat_punct(&mut self, id: PunctuationId) -> bool {
        if self.at_punct(id) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, id: PunctuationId) -> bool {
        if self.eat_punct(id) {
            return true;
        }
        let expected = format!("'{}', found {}", punctuation::as_str(id), self.current().describe());
        let span = self.current_span();
        self.error(errors::expected_token(&expected, span));
        false
    }

    fn expect_ident(&mut self, what: &str) -> bool {
        if self.current() == TokenKind::Ident {
            self.bump();
            return true;
        }
        let expected = format!("{what}, found {}", self.current().describe());
        let span = self.current_span();
        self.error(errors::expected_token(&expected, span));
        false
    }

    /// Record a diagnostic anchored to the node under construction.
    fn error(&mut self, diagnostic: Diagnostic) {
        let diagnostic = match self.builder.current() {
            Some(node) => diagnostic.with_node(node),
            None => diagnostic,
        };
        self.diagnostics.push(diagnostic);
    }

    /// Record a diagnostic and wrap the current token in an `Error` node.
    fn error_and_bump(&mut self, diagnostic: Diagnostic) {
        self.builder.start_node(SyntaxKind::Error);
        self.error(diagnostic);
        self.bump();
        self.builder.finish_node();
    }

    /// Diagnose `construct` unless `feature` is enabled.
    fn gate(&mut self, feature: FeatureId, construct: &str, span: Span) {
        if !self.features.is_enabled(feature) {
            self.error(errors::feature_disabled(construct, features::name(feature), span));
        }
    }

    /// Enter a nested construct. Returns `false` (after diagnosing and skipping a token) when too deep.
    fn enter(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            let span = self.current_span();
            self.error_and_bump(errors::nesting_too_deep(span));
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}
