/// Declarations, item lists and conditional-compilation blocks.
impl Parser {
    /// Parse items until `Eof` or until `stop` matches.
    fn items(&mut self, stop: fn(&Parser) -> bool) {
        while !self.at_eof() && !stop(self) {
            let before = self.nth_index(0);
            self.item();
            while self.eat_punct(PunctuationId::Semicolon) {}
            if self.nth_index(0) == before && !self.at_eof() {
                let found = self.current().describe();
                let span = self.current_span();
                self.error_and_bump(errors::expected_declaration(&found, span));
            }
        }
    }

    fn item(&mut self) {
        match self.current() {
            TokenKind::Keyword(KeywordId::Import) => self.import_decl(),
            TokenKind::Keyword(KeywordId::Func) => self.func_decl(),
            TokenKind::Keyword(KeywordId::Let | KeywordId::Var) => self.let_decl(),
            TokenKind::Keyword(KeywordId::Macro) => self.macro_decl(),
            TokenKind::PoundIf => self.if_config(),
            TokenKind::Keyword(KeywordId::Return | KeywordId::Then | KeywordId::Yield) => self.statement(),
            _ if self.at_expr_start() => self.statement(),
            TokenKind::Unknown => {
                // Already diagnosed by the lexer.
                self.builder.start_node(SyntaxKind::Error);
                self.bump();
                self.builder.finish_node();
            }
            found => {
                let span = self.current_span();
                self.error_and_bump(errors::expected_declaration(&found.describe(), span));
            }
        }
    }

    fn import_decl(&mut self) {
        self.builder.start_node(SyntaxKind::ImportDecl);
        self.bump();
        self.builder.start_node(SyntaxKind::ImportPath);
        if self.expect_ident("module name") {
            while self.at_punct(PunctuationId::Dot) {
                self.bump();
                if !self.expect_ident("module name") {
                    break;
                }
            }
        }
        self.builder.finish_node();
        self.builder.finish_node();
    }

    fn func_decl(&mut self) {
        self.builder.start_node(SyntaxKind::FuncDecl);
        self.bump();
        self.expect_ident("function name");
        self.param_list();
        if self.eat_punct(PunctuationId::Arrow) {
            self.type_annotation();
        }
        self.block_or_error();
        self.builder.finish_node();
    }

    fn param_list(&mut self) {
        if !self.at_punct(PunctuationId::LParen) {
            self.expect_punct(PunctuationId::LParen);
            return;
        }
        self.builder.start_node(SyntaxKind::ParamList);
        self.bump();
        while !self.at_punct(PunctuationId::RParen) && !self.at_punct(PunctuationId::LBrace) && !self.at_eof() {
            if self.current() == TokenKind::Ident {
                self.param();
            } else if self.at_recovery_point() {
                break;
            } else {
                let expected = format!("parameter name, found {}", self.current().describe());
                let span = self.current_span();
                self.error_and_bump(errors::expected_token(&expected, span));
                continue;
            }
            if !self.eat_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen);
        self.builder.finish_node();
    }

    fn param(&mut self) {
        self.builder.start_node(SyntaxKind::Param);
        self.bump();
        if self.expect_punct(PunctuationId::Colon) {
            self.type_annotation();
        }
        self.builder.finish_node();
    }

    fn type_annotation(&mut self) {
        if !self.enter() {
            return;
        }
        self.builder.start_node(SyntaxKind::TypeAnnotation);
        match self.current() {
            TokenKind::Ident => {
                self.bump();
                while self.at_punct(PunctuationId::Dot) && self.nth(1) == TokenKind::Ident {
                    self.bump();
                    self.bump();
                }
            }
            TokenKind::Punctuation(PunctuationId::LBracket) => {
                self.bump();
                self.type_annotation();
                self.expect_punct(PunctuationId::RBracket);
            }
            found => {
                let expected = format!("type, found {}", found.describe());
                let span = self.current_span();
                self.error(errors::expected_token(&expected, span));
            }
        }
        self.builder.finish_node();
        self.leave();
    }

    fn let_decl(&mut self) {
        self.builder.start_node(SyntaxKind::LetDecl);
        self.bump();
        self.expect_ident("binding name");
        if self.eat_punct(PunctuationId::Colon) {
            self.type_annotation();
        }
        if self.eat_punct(PunctuationId::Assign) {
            self.expr_or_error();
        }
        self.builder.finish_node();
    }

    fn macro_decl(&mut self) {
        self.builder.start_node(SyntaxKind::MacroDecl);
        let span = self.current_span();
        self.bump();
        self.gate(FeatureId::Macros, "'macro' declaration", span);
        self.expect_ident("macro name");
        self.param_list();
        if self.eat_punct(PunctuationId::Arrow) {
            self.type_annotation();
        }
        if self.eat_punct(PunctuationId::Assign) {
            self.expr_or_error();
        }
        self.builder.finish_node();
    }

    /// `#if cond ... (#elseif cond ...)* (#else ...)? #endif`
    fn if_config(&mut self) {
        if !self.enter() {
            return;
        }
        self.builder.start_node(SyntaxKind::IfConfig);

        self.if_config_clause(true);
        loop {
            match self.current() {
                TokenKind::PoundElseIf => self.if_config_clause(true),
                TokenKind::PoundElse => self.if_config_clause(false),
                _ => break,
            }
        }

        if self.current() == TokenKind::PoundEndIf {
            self.bump();
        } else {
            let span = self.current_span();
            self.error(errors::unterminated_if_config(span));
        }
        self.builder.finish_node();
        self.leave();
    }

    fn if_config_clause(&mut self, has_condition: bool) {
        self.builder.start_node(SyntaxKind::IfConfigClause);
        self.bump();
        if has_condition {
            self.expr_or_error();
        }
        self.items(|p| {
            matches!(
                p.current(),
                TokenKind::PoundElseIf | TokenKind::PoundElse | TokenKind::PoundEndIf
            ) || p.at_punct(PunctuationId::RBrace)
        });
        self.builder.finish_node();
    }

    fn block(&mut self) {
        if !self.enter() {
            return;
        }
        self.builder.start_node(SyntaxKind::Block);
        self.bump();
        self.items(|p| p.at_punct(PunctuationId::RBrace));
        self.expect_punct(PunctuationId::RBrace);
        self.builder.finish_node();
        self.leave();
    }

    fn block_or_error(&mut self) {
        if self.at_punct(PunctuationId::LBrace) {
            self.block();
        } else {
            self.expect_punct(PunctuationId::LBrace);
        }
    }
}
