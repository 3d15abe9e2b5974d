//! Lossless syntax tree.
//!
//! The tree is an arena of nodes. Each node has a [`SyntaxKind`], a parent link, and an ordered list of children,
//! each either a nested node or a token (by index into the token stream). Trivia tokens are children like any
//! other token, so an in-order walk of the tree visits every token exactly once and re-serializes the input.

use crate::buffer::Span;
use crate::lexer::{Token, TokenKind};

/// Index of a node in a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    SourceFile,

    // Declarations
    ImportDecl,
    ImportPath,
    FuncDecl,
    ParamList,
    Param,
    TypeAnnotation,
    LetDecl,
    MacroDecl,

    // Conditional compilation
    IfConfig,
    IfConfigClause,

    // Statements
    Block,
    ReturnStmt,
    ThenStmt,
    YieldStmt,
    ExprStmt,

    // Expressions
    BinaryExpr,
    PrefixExpr,
    CallExpr,
    ArgList,
    MemberExpr,
    ParenExpr,
    Literal,
    NameRef,
    PlaceholderExpr,
    DoExpr,
    IfExpr,
    ElseClause,

    /// Tokens the parser could not fit into any construct.
    Error,
}

/// A child of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Node(NodeId),
    Token(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: SyntaxKind,
    parent: Option<NodeId>,
    children: Vec<Child>,
}

/// Immutable syntax tree plus the token stream it indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    tokens: Vec<Token>,
    /// Node that owns each token, indexed like `tokens`.
    token_owner: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> SyntaxKind {
        self.nodes[node.index()].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> &[Child] {
        &self.nodes[node.index()].children
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: u32) -> Token {
        self.tokens[index as usize]
    }

    /// Nodes that are direct children of `node`.
    pub fn child_nodes(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node).iter().filter_map(|c| match c {
            Child::Node(n) => Some(*n),
            Child::Token(_) => None,
        })
    }

    /// Non-trivia tokens that are direct children of `node`.
    pub fn child_tokens(&self, node: NodeId) -> impl Iterator<Item = Token> + '_ {
        self.children(node).iter().filter_map(|c| match c {
            Child::Token(t) => Some(self.token(*t)).filter(|t| !t.kind.is_trivia()),
            Child::Node(_) => None,
        })
    }

    /// `node` and its ancestors, innermost first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), move |n| self.parent(*n))
    }

    /// Whether `node` is (or is nested inside) a conditional-compilation block.
    pub fn is_in_conditional_region(&self, node: NodeId) -> bool {
        self.ancestors(node).any(|n| self.kind(n) == SyntaxKind::IfConfig)
    }

    /// All nodes in document order (pre-order).
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            let kids: Vec<NodeId> = self.child_nodes(n).collect();
            stack.extend(kids.into_iter().rev());
        }
        out
    }

    /// Span of the non-trivia tokens under `node`, if it has any.
    pub fn node_span(&self, node: NodeId) -> Option<Span> {
        let mut span: Option<Span> = None;
        self.visit_tokens(node, &mut |_, token| {
            if !token.kind.is_trivia() && token.kind != TokenKind::Eof {
                span = Some(span.map_or(token.span, |s| s.cover(token.span)));
            }
        });
        span
    }

    /// Node owning the token that covers `offset`.
    pub fn node_at_offset(&self, offset: u32) -> NodeId {
        let idx = self.tokens.partition_point(|t| t.span.end <= offset);
        let idx = idx.min(self.tokens.len().saturating_sub(1));
        self.token_owner.get(idx).copied().unwrap_or(self.root())
    }

    /// Re-serialize the tree by concatenating each token's bytes in tree order.
    pub fn text(&self, source: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(source.len());
        self.visit_tokens(self.root(), &mut |_, token| {
            let end = (token.span.end as usize).min(source.len());
            let start = (token.span.start as usize).min(end);
            out.extend_from_slice(&source[start..end]);
        });
        out
    }

    /// Indented outline of nodes (with spans) and their significant tokens.
    pub fn debug_dump(&self, source: &[u8]) -> String {
        let mut lines = vec![self.node_line(self.root(), 0)];
        let mut stack: Vec<(std::slice::Iter<'_, Child>, usize)> = vec![(self.children(self.root()).iter(), 0)];
        while let Some((children, depth)) = stack.last_mut() {
            let depth = *depth;
            match children.next() {
                Some(Child::Node(n)) => {
                    lines.push(self.node_line(*n, depth + 1));
                    stack.push((self.children(*n).iter(), depth + 1));
                }
                Some(Child::Token(t)) => {
                    let token = self.token(*t);
                    if token.kind.is_trivia() || token.kind == TokenKind::Eof {
                        continue;
                    }
                    let end = (token.span.end as usize).min(source.len());
                    let start = (token.span.start as usize).min(end);
                    let text = String::from_utf8_lossy(&source[start..end]);
                    lines.push(format!("{}  {:?} {:?}", "  ".repeat(depth), token.kind, text));
                }
                None => {
                    stack.pop();
                }
            }
        }
        lines.join("\n")
    }

    fn node_line(&self, node: NodeId, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match self.node_span(node) {
            Some(span) => format!("{indent}{:?}@{}..{}", self.kind(node), span.start, span.end),
            None => format!("{indent}{:?}", self.kind(node)),
        }
    }

    /// Every token under `node` in document order. Iterative, so tree depth never touches the call stack.
    fn visit_tokens(&self, node: NodeId, f: &mut dyn FnMut(u32, Token)) {
        let mut stack = vec![self.children(node).iter()];
        while let Some(children) = stack.last_mut() {
            match children.next() {
                Some(Child::Token(t)) => f(*t, self.token(*t)),
                Some(Child::Node(n)) => stack.push(self.children(*n).iter()),
                None => {
                    stack.pop();
                }
            }
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Position in the current node's child list, used to wrap already-built children in a new node.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint(usize);

/// Incremental builder used by the parser.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    token_owner: Vec<Option<NodeId>>,
}

impl TreeBuilder {
    pub fn new(token_count: usize) -> Self {
        Self {
            nodes: Vec::new(),
            stack: Vec::new(),
            token_owner: vec![None; token_count],
        }
    }

    /// Node currently being built.
    pub fn current(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    fn alloc(&mut self, kind: SyntaxKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn start_node(&mut self, kind: SyntaxKind) -> NodeId {
        let parent = self.current();
        let id = self.alloc(kind, parent);
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(Child::Node(id));
        }
        self.stack.push(id);
        id
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let len = self
            .current()
            .map_or(0, |n| self.nodes[n.index()].children.len());
        Checkpoint(len)
    }

    /// Start a node that adopts every child added to the current node since `checkpoint`.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) -> NodeId {
        let Some(parent) = self.current() else {
            return self.start_node(kind);
        };
        let id = self.alloc(kind, Some(parent));
        let adopted: Vec<Child> = self.nodes[parent.index()].children.drain(checkpoint.0..).collect();
        for child in &adopted {
            match *child {
                Child::Node(n) => self.nodes[n.index()].parent = Some(id),
                Child::Token(t) => self.token_owner[t as usize] = Some(id),
            }
        }
        self.nodes[id.index()].children = adopted;
        self.nodes[parent.index()].children.push(Child::Node(id));
        self.stack.push(id);
        id
    }

    pub fn token(&mut self, index: u32) {
        if let Some(current) = self.current() {
            self.nodes[current.index()].children.push(Child::Token(index));
            self.token_owner[index as usize] = Some(current);
        }
    }

    pub fn finish_node(&mut self) {
        self.stack.pop();
    }

    pub fn finish(self, tokens: Vec<Token>) -> SyntaxTree {
        let root = NodeId(0);
        let token_owner = self.token_owner.into_iter().map(|o| o.unwrap_or(root)).collect();
        SyntaxTree {
            nodes: self.nodes,
            tokens,
            token_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, start: u32, end: u32) -> Token {
        Token::new(kind, Span::new(start, end))
    }

    #[test]
    fn test_checkpoint_adopts_children() {
        // "a+b"
        let tokens = vec![
            tok(TokenKind::Ident, 0, 1),
            tok(TokenKind::Punctuation(quill_core::lang::punctuation::PunctuationId::Plus), 1, 2),
            tok(TokenKind::Ident, 2, 3),
            tok(TokenKind::Eof, 3, 3),
        ];
        let mut b = TreeBuilder::new(tokens.len());
        let root = b.start_node(SyntaxKind::SourceFile);
        let cp = b.checkpoint();
        b.start_node(SyntaxKind::NameRef);
        b.token(0);
        b.finish_node();
        let bin = b.start_node_at(cp, SyntaxKind::BinaryExpr);
        b.token(1);
        b.start_node(SyntaxKind::NameRef);
        b.token(2);
        b.finish_node();
        b.finish_node();
        b.token(3);
        b.finish_node();
        let tree = b.finish(tokens);

        assert_eq!(tree.root(), root);
        let top: Vec<_> = tree.child_nodes(root).collect();
        assert_eq!(top, vec![bin]);
        let operands: Vec<_> = tree.child_nodes(bin).map(|n| tree.kind(n)).collect();
        assert_eq!(operands, vec![SyntaxKind::NameRef, SyntaxKind::NameRef]);
        for n in tree.child_nodes(bin) {
            assert_eq!(tree.parent(n), Some(bin));
        }
        assert_eq!(tree.node_span(bin), Some(Span::new(0, 3)));
        assert_eq!(tree.text(b"a+b"), b"a+b".to_vec());
        assert_eq!(tree.node_at_offset(1), bin);
    }

    #[test]
    fn test_conditional_region_includes_self() {
        let tokens = vec![tok(TokenKind::Eof, 0, 0)];
        let mut b = TreeBuilder::new(tokens.len());
        b.start_node(SyntaxKind::SourceFile);
        let cfg = b.start_node(SyntaxKind::IfConfig);
        let clause = b.start_node(SyntaxKind::IfConfigClause);
        b.finish_node();
        b.finish_node();
        let outside = b.start_node(SyntaxKind::ExprStmt);
        b.finish_node();
        b.token(0);
        b.finish_node();
        let tree = b.finish(tokens);

        assert!(tree.is_in_conditional_region(cfg));
        assert!(tree.is_in_conditional_region(clause));
        assert!(!tree.is_in_conditional_region(outside));
        assert!(!tree.is_in_conditional_region(tree.root()));
        assert_eq!(tree.node_span(outside), None);
    }
}
