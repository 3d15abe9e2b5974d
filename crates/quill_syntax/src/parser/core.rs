/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type and its top-level `parse()` entrypoint.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser`.
/// - Nesting deeper than this is reported and the offending token skipped, bounding recursion on hostile input.
const MAX_DEPTH: usize = 128;

/// Parser state.
///
/// ## Notes
/// - The parser is single-pass and never aborts. Every token, significant or trivia, is attached to exactly one
///   node, which is what keeps the tree lossless.
/// - Diagnostics are anchored to the node being built when they were found.
pub struct Parser {
    tokens: Vec<Token>,
    /// Index of the next unconsumed token (possibly trivia).
    pos: usize,
    builder: TreeBuilder,
    diagnostics: Vec<Diagnostic>,
    lex_diagnostics: Vec<Diagnostic>,
    features: ExperimentalFeatures,
    depth: usize,
}

/// Result of parsing: the tree and every diagnostic (lexical and syntactic) in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    tree: SyntaxTree,
    diagnostics: Vec<Diagnostic>,
}

impl Parse {
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (SyntaxTree, Vec<Diagnostic>) {
        (self.tree, self.diagnostics)
    }
}

impl Parser {
    /// Create a parser over a lexed token stream.
    pub fn new(lexed: Lexed, features: ExperimentalFeatures) -> Self {
        let builder = TreeBuilder::new(lexed.tokens.len());
        Self {
            tokens: lexed.tokens,
            pos: 0,
            builder,
            diagnostics: Vec::new(),
            lex_diagnostics: lexed.diagnostics,
            features,
            depth: 0,
        }
    }

    /// Parse the entire token stream into a [`Parse`].
    pub fn parse(mut self) -> Parse {
        self.builder.start_node(SyntaxKind::SourceFile);
        self.items(|_| false);

        // Trailing trivia and the Eof token belong to the root.
        self.bump_trivia();
        if self.pos < self.tokens.len() {
            self.builder.token(self.pos as u32);
            self.pos += 1;
        }
        self.builder.finish_node();

        let tree = self.builder.finish(self.tokens);
        let mut diagnostics: Vec<Diagnostic> = self
            .lex_diagnostics
            .into_iter()
            .map(|d| {
                let node = tree.node_at_offset(d.span.start);
                d.with_node(node)
            })
            .collect();
        diagnostics.extend(self.diagnostics);
        diagnostics.sort_by_key(|d| d.span.start);

        Parse { tree, diagnostics }
    }
}
