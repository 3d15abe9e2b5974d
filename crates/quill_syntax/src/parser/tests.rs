#[cfg(test)]
/// Parser unit tests.
///
/// These cover specific syntactic forms, experimental-feature gating and error recovery. Every test also checks
/// that the tree re-serializes to its input.
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticId, Severity};
    use proptest::prelude::*;

    fn parse_with(source: &str, features: ExperimentalFeatures) -> Parse {
        let parsed = parse(source.as_bytes(), features);
        assert_eq!(
            parsed.tree().text(source.as_bytes()),
            source.as_bytes(),
            "tree must re-serialize to its input"
        );
        parsed
    }

    fn parse_str(source: &str) -> Parse {
        parse_with(source, ExperimentalFeatures::empty())
    }

    fn root_kinds(parsed: &Parse) -> Vec<SyntaxKind> {
        let tree = parsed.tree();
        tree.child_nodes(tree.root()).map(|n| tree.kind(n)).collect()
    }

    fn ids(parsed: &Parse) -> Vec<DiagnosticId> {
        parsed.diagnostics().iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_tree_outline() {
        let source = "let x = 1 + 2";
        let parsed = parse_str(source);
        insta::assert_snapshot!(parsed.tree().debug_dump(source.as_bytes()), @r#"
        SourceFile@0..13
          LetDecl@0..13
            Keyword(Let) "let"
            Ident "x"
            Punctuation(Assign) "="
            BinaryExpr@8..13
              Literal@8..9
                Int "1"
              Punctuation(Plus) "+"
              Literal@12..13
                Int "2"
        "#);
    }

    #[test]
    fn test_parse_clean_program() {
        let source = r#"import Foundation.Net
func add(a: Int, b: Int) -> Int {
    return a + b
}
let total = add(1, 2)
"#;
        let parsed = parse_str(source);
        assert!(parsed.diagnostics().is_empty(), "unexpected: {:?}", parsed.diagnostics());
        assert_eq!(
            root_kinds(&parsed),
            vec![SyntaxKind::ImportDecl, SyntaxKind::FuncDecl, SyntaxKind::LetDecl]
        );
    }

    #[test]
    fn test_empty_source() {
        let parsed = parse_str("");
        assert!(parsed.diagnostics().is_empty());
        assert_eq!(parsed.tree().node_count(), 1);
        assert_eq!(parsed.tree().node_span(parsed.tree().root()), None);
    }

    #[test]
    fn test_binary_precedence_and_associativity() {
        let parsed = parse_str("1 + 2 * 3\n");
        let tree = parsed.tree();
        let stmt = tree.child_nodes(tree.root()).next().unwrap();
        let outer = tree.child_nodes(stmt).next().unwrap();
        assert_eq!(tree.kind(outer), SyntaxKind::BinaryExpr);
        let operands: Vec<_> = tree.child_nodes(outer).map(|n| tree.kind(n)).collect();
        assert_eq!(operands, vec![SyntaxKind::Literal, SyntaxKind::BinaryExpr]);

        let parsed = parse_str("1 - 2 - 3\n");
        let tree = parsed.tree();
        let stmt = tree.child_nodes(tree.root()).next().unwrap();
        let outer = tree.child_nodes(stmt).next().unwrap();
        let operands: Vec<_> = tree.child_nodes(outer).map(|n| tree.kind(n)).collect();
        assert_eq!(operands, vec![SyntaxKind::BinaryExpr, SyntaxKind::Literal]);
    }

    #[test]
    fn test_call_does_not_continue_across_lines() {
        let parsed = parse_str("a\n(b)\n");
        assert!(parsed.diagnostics().is_empty());
        assert_eq!(root_kinds(&parsed), vec![SyntaxKind::ExprStmt, SyntaxKind::ExprStmt]);
    }

    #[test]
    fn test_member_access_and_call_chain() {
        let parsed = parse_str("net.client(1).send(x)\n");
        assert!(parsed.diagnostics().is_empty());
        let tree = parsed.tree();
        let stmt = tree.child_nodes(tree.root()).next().unwrap();
        let expr = tree.child_nodes(stmt).next().unwrap();
        assert_eq!(tree.kind(expr), SyntaxKind::CallExpr);
    }

    #[test]
    fn test_if_else_expression() {
        let parsed = parse_str("if a { 1 } else if b { 2 } else { 3 }\n");
        assert!(parsed.diagnostics().is_empty(), "unexpected: {:?}", parsed.diagnostics());
        let tree = parsed.tree();
        let kinds: Vec<_> = tree.descendants(tree.root()).into_iter().map(|n| tree.kind(n)).collect();
        assert_eq!(kinds.iter().filter(|k| **k == SyntaxKind::IfExpr).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == SyntaxKind::ElseClause).count(), 2);
    }

    #[test]
    fn test_experimental_constructs_are_gated() {
        let cases = [
            ("macro m() = 1\n", FeatureId::Macros),
            ("let x = do { 1 }\n", FeatureId::DoExpressions),
            ("then 1\n", FeatureId::ThenStatements),
            ("let y = x |> f\n", FeatureId::PipelineOperator),
            ("yield 1\n", FeatureId::CoroutineAccessors),
        ];
        for (source, feature) in cases {
            let disabled = parse_str(source);
            assert_eq!(
                ids(&disabled),
                vec![DiagnosticId::ExperimentalFeatureDisabled],
                "source: {source}"
            );
            assert!(
                disabled.diagnostics()[0].message.contains(features::name(feature)),
                "message should name the feature; got: {}",
                disabled.diagnostics()[0].message
            );

            let enabled = parse_with(source, ExperimentalFeatures::flag(feature));
            assert!(enabled.diagnostics().is_empty(), "source: {source}: {:?}", enabled.diagnostics());
        }
    }

    #[test]
    fn test_unrelated_feature_does_not_ungate() {
        let parsed = parse_with("let x = do { 1 }\n", ExperimentalFeatures::MACROS);
        assert_eq!(ids(&parsed), vec![DiagnosticId::ExperimentalFeatureDisabled]);
    }

    #[test]
    fn test_editor_placeholder_is_error() {
        let parsed = parse_str("let x = <#value#>\n");
        assert_eq!(ids(&parsed), vec![DiagnosticId::EditorPlaceholder]);
        let diag = &parsed.diagnostics()[0];
        assert_eq!(diag.severity, Severity::Error);
        let node = diag.node.expect("placeholder diagnostic is anchored");
        assert_eq!(parsed.tree().kind(node), SyntaxKind::PlaceholderExpr);
    }

    #[test]
    fn test_placeholder_inside_if_config_is_in_conditional_region() {
        let source = "#if DEBUG\nlet x = <#v#>\n#endif\nlet y = <#w#>\n";
        let parsed = parse_str(source);
        assert_eq!(
            ids(&parsed),
            vec![DiagnosticId::EditorPlaceholder, DiagnosticId::EditorPlaceholder]
        );
        let tree = parsed.tree();
        let regions: Vec<bool> = parsed
            .diagnostics()
            .iter()
            .map(|d| tree.is_in_conditional_region(d.node.unwrap()))
            .collect();
        assert_eq!(regions, vec![true, false]);
    }

    #[test]
    fn test_if_config_with_all_clauses() {
        let source = "#if A\nlet a = 1\n#elseif B\nlet b = 2\n#else\nlet c = 3\n#endif\n";
        let parsed = parse_str(source);
        assert!(parsed.diagnostics().is_empty(), "unexpected: {:?}", parsed.diagnostics());
        let tree = parsed.tree();
        let config = tree.child_nodes(tree.root()).next().unwrap();
        assert_eq!(tree.kind(config), SyntaxKind::IfConfig);
        assert_eq!(tree.child_nodes(config).count(), 3);
    }

    #[test]
    fn test_unterminated_if_config() {
        let parsed = parse_str("#if A\nlet x = 1\n");
        assert_eq!(ids(&parsed), vec![DiagnosticId::UnterminatedIfConfig]);
    }

    #[test]
    fn test_missing_paren_recovers_without_cascade() {
        let parsed = parse_str("func f( { }\nlet y = 2\n");
        assert_eq!(ids(&parsed), vec![DiagnosticId::ExpectedToken]);
        assert_eq!(root_kinds(&parsed), vec![SyntaxKind::FuncDecl, SyntaxKind::LetDecl]);
    }

    #[test]
    fn test_stray_token_becomes_error_node() {
        let parsed = parse_str(") let x = 1\n");
        assert_eq!(ids(&parsed), vec![DiagnosticId::ExpectedDeclaration]);
        assert_eq!(root_kinds(&parsed), vec![SyntaxKind::Error, SyntaxKind::LetDecl]);
    }

    #[test]
    fn test_lexer_diagnostic_is_anchored_without_duplicate() {
        let parsed = parse_str("let x = 1 $\n");
        assert_eq!(ids(&parsed), vec![DiagnosticId::InvalidCharacter]);
        let node = parsed.diagnostics()[0].node.unwrap();
        assert_eq!(parsed.tree().kind(node), SyntaxKind::Error);
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let source = "(".repeat(1000);
        let parsed = parse_str(&source);
        assert!(ids(&parsed).contains(&DiagnosticId::NestingTooDeep));
    }

    /// Deepest node, measured without recursion.
    fn tree_depth(parsed: &Parse) -> usize {
        let tree = parsed.tree();
        let mut depth = vec![0usize; tree.node_count()];
        for node in tree.descendants(tree.root()) {
            if let Some(parent) = tree.parent(node) {
                depth[node.index()] = depth[parent.index()] + 1;
            }
        }
        depth.into_iter().max().unwrap_or(0)
    }

    #[test]
    fn test_deep_if_config_nesting_is_bounded() {
        let source = "#if A\n".repeat(20_000);
        let parsed = parse_str(&source);
        assert!(ids(&parsed).contains(&DiagnosticId::NestingTooDeep));
        assert!(ids(&parsed).contains(&DiagnosticId::UnterminatedIfConfig));
        assert!(tree_depth(&parsed) < 4 * MAX_DEPTH);
        assert!(!parsed.tree().debug_dump(source.as_bytes()).is_empty());
    }

    #[test]
    fn test_long_postfix_chain_is_bounded() {
        for source in [
            format!("a{}\n", "()".repeat(20_000)),
            format!("a{}\n", ".b".repeat(20_000)),
            format!("let x = f(1){}\n", "(2).c".repeat(5_000)),
        ] {
            let parsed = parse_str(&source);
            assert!(ids(&parsed).contains(&DiagnosticId::NestingTooDeep), "{source:.16}");
            assert!(tree_depth(&parsed) < 4 * MAX_DEPTH);
        }
    }

    #[test]
    fn test_long_binary_chain_is_bounded() {
        let source = format!("let x = 1{}\n", " + 1".repeat(20_000));
        let parsed = parse_str(&source);
        assert!(ids(&parsed).contains(&DiagnosticId::NestingTooDeep));
        assert!(tree_depth(&parsed) < 4 * MAX_DEPTH);
    }

    #[test]
    fn test_short_postfix_chain_is_not_diagnosed() {
        let parsed = parse_str("let x = a.b(1).c(2, 3).d\n");
        assert!(parsed.diagnostics().is_empty(), "{:?}", parsed.diagnostics());
    }

    #[test]
    fn test_diagnostics_are_in_source_order() {
        let parsed = parse_str("let a = <#x#>\n$\nlet b = do { 1 }\n");
        let starts: Vec<u32> = parsed.diagnostics().iter().map(|d| d.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(starts.len(), 3);
    }

    #[test]
    fn test_every_node_is_reachable_from_root() {
        let parsed = parse_str("func f(a: [Int]) -> Int { return -a.count }\n");
        let tree = parsed.tree();
        let all = tree.descendants(tree.root());
        assert_eq!(all.len(), tree.node_count());
        for node in all {
            assert_eq!(tree.ancestors(node).last(), Some(tree.root()));
        }
    }

    #[test]
    fn test_malformed_inputs_round_trip() {
        for source in [
            "func",
            "func (",
            "let = = =",
            "#else\n#endif\n}",
            "\"unterminated",
            "/* open",
            "<# open",
            "import .",
            "if { else",
            "a.(b",
        ] {
            let _ = parse_str(source);
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let parsed = parse(&bytes, ExperimentalFeatures::all());
            prop_assert_eq!(parsed.tree().text(&bytes), bytes);
        }
    }
}
