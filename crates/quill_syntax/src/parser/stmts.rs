/// Statements.
impl Parser {
    fn statement(&mut self) {
        match self.current() {
            TokenKind::Keyword(KeywordId::Return) => {
                self.builder.start_node(SyntaxKind::ReturnStmt);
                self.bump();
                if !self.at_line_break() && self.at_expr_start() {
                    self.expr();
                }
                self.builder.finish_node();
            }
            TokenKind::Keyword(KeywordId::Then) => {
                self.builder.start_node(SyntaxKind::ThenStmt);
                let span = self.current_span();
                self.bump();
                self.gate(FeatureId::ThenStatements, "'then' statement", span);
                self.expr_or_error();
                self.builder.finish_node();
            }
            TokenKind::Keyword(KeywordId::Yield) => {
                self.builder.start_node(SyntaxKind::YieldStmt);
                let span = self.current_span();
                self.bump();
                self.gate(FeatureId::CoroutineAccessors, "'yield' statement", span);
                if !self.at_line_break() && self.at_expr_start() {
                    self.expr();
                }
                self.builder.finish_node();
            }
            _ => {
                self.builder.start_node(SyntaxKind::ExprStmt);
                self.expr();
                if self.eat_punct(PunctuationId::Assign) {
                    self.expr_or_error();
                }
                self.builder.finish_node();
            }
        }
    }
}
