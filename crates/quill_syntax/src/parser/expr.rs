/// Expressions: precedence climbing over the binary operator table, then prefix, postfix and primaries.
impl Parser {
    fn at_expr_start(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::Int
                | TokenKind::String
                | TokenKind::Ident
                | TokenKind::Placeholder
                | TokenKind::Keyword(KeywordId::True | KeywordId::False | KeywordId::Do | KeywordId::If)
                | TokenKind::Punctuation(PunctuationId::LParen | PunctuationId::Minus | PunctuationId::Bang)
        )
    }

    fn expr(&mut self) {
        self.expr_bp(0);
    }

    fn expr_or_error(&mut self) {
        if self.at_expr_start() {
            self.expr();
        } else {
            let span = self.current_span();
            self.error(errors::expected_expression(span));
        }
    }

    /// Binary operators bind left-associatively; `min_prec` is the loosest operator this call may consume.
    fn expr_bp(&mut self, min_prec: u8) {
        if !self.enter() {
            return;
        }
        let checkpoint = self.builder.checkpoint();
        self.prefix_expr();

        // Each operator wraps everything parsed so far, so a long chain nests as deep as it is long.
        let mut wrapped = 0;
        loop {
            let TokenKind::Punctuation(op) = self.current() else {
                break;
            };
            let Some(prec) = punctuation::binary_precedence(op) else {
                break;
            };
            if prec < min_prec || !self.enter() {
                break;
            }
            wrapped += 1;
            self.builder.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            if op == PunctuationId::Pipe {
                let span = self.current_span();
                self.gate(FeatureId::PipelineOperator, "'|>' operator", span);
            }
            self.bump();
            if self.at_expr_start() {
                self.expr_bp(prec + 1);
            } else {
                let span = self.current_span();
                self.error(errors::expected_expression(span));
            }
            self.builder.finish_node();
        }
        for _ in 0..=wrapped {
            self.leave();
        }
    }

    fn prefix_expr(&mut self) {
        match self.current() {
            TokenKind::Punctuation(PunctuationId::Minus | PunctuationId::Bang) => {
                if !self.enter() {
                    return;
                }
                self.builder.start_node(SyntaxKind::PrefixExpr);
                self.bump();
                if self.at_expr_start() {
                    self.prefix_expr();
                } else {
                    let span = self.current_span();
                    self.error(errors::expected_expression(span));
                }
                self.builder.finish_node();
                self.leave();
            }
            _ => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) {
        let checkpoint = self.builder.checkpoint();
        if !self.primary_expr() {
            return;
        }
        // Calls and member accesses must start on the same line as their base. Like binary operators, every link
        // of the chain wraps its base and counts as one level of nesting.
        let mut wrapped = 0;
        while !self.at_line_break() {
            let kind = match self.current() {
                TokenKind::Punctuation(PunctuationId::LParen) => SyntaxKind::CallExpr,
                TokenKind::Punctuation(PunctuationId::Dot) => SyntaxKind::MemberExpr,
                _ => break,
            };
            if !self.enter() {
                break;
            }
            wrapped += 1;
            self.builder.start_node_at(checkpoint, kind);
            if kind == SyntaxKind::CallExpr {
                self.arg_list();
            } else {
                self.bump();
                self.expect_ident("member name");
            }
            self.builder.finish_node();
        }
        for _ in 0..wrapped {
            self.leave();
        }
    }

    fn arg_list(&mut self) {
        self.builder.start_node(SyntaxKind::ArgList);
        self.bump();
        while !self.at_punct(PunctuationId::RParen) && !self.at_eof() {
            if self.at_expr_start() {
                self.expr();
            } else if self.at_recovery_point() {
                break;
            } else {
                let span = self.current_span();
                self.error_and_bump(errors::expected_expression(span));
                continue;
            }
            if !self.eat_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen);
        self.builder.finish_node();
    }

    /// Returns `false` when no expression starts here; nothing is consumed in that case.
    fn primary_expr(&mut self) -> bool {
        match self.current() {
            TokenKind::Int | TokenKind::String | TokenKind::Keyword(KeywordId::True | KeywordId::False) => {
                self.builder.start_node(SyntaxKind::Literal);
                self.bump();
                self.builder.finish_node();
            }
            TokenKind::Ident => {
                self.builder.start_node(SyntaxKind::NameRef);
                self.bump();
                self.builder.finish_node();
            }
            TokenKind::Placeholder => {
                self.builder.start_node(SyntaxKind::PlaceholderExpr);
                let span = self.current_span();
                self.bump();
                self.error(errors::editor_placeholder(span));
                self.builder.finish_node();
            }
            TokenKind::Punctuation(PunctuationId::LParen) => {
                self.builder.start_node(SyntaxKind::ParenExpr);
                self.bump();
                self.expr_or_error();
                self.expect_punct(PunctuationId::RParen);
                self.builder.finish_node();
            }
            TokenKind::Keyword(KeywordId::Do) => {
                self.builder.start_node(SyntaxKind::DoExpr);
                let span = self.current_span();
                self.bump();
                self.gate(FeatureId::DoExpressions, "'do' expression", span);
                self.block_or_error();
                self.builder.finish_node();
            }
            TokenKind::Keyword(KeywordId::If) => self.if_expr(),
            _ => {
                let span = self.current_span();
                self.error(errors::expected_expression(span));
                return false;
            }
        }
        true
    }

    fn if_expr(&mut self) {
        if !self.enter() {
            return;
        }
        self.builder.start_node(SyntaxKind::IfExpr);
        self.bump();
        self.expr_or_error();
        self.block_or_error();
        if self.at_keyword(KeywordId::Else) {
            self.builder.start_node(SyntaxKind::ElseClause);
            self.bump();
            if self.at_keyword(KeywordId::If) {
                self.if_expr();
            } else {
                self.block_or_error();
            }
            self.builder.finish_node();
        }
        self.builder.finish_node();
        self.leave();
    }
}
