#[cfg(test)]
/// Parser unit tests.
///
/// These tests focus on specific syntactic forms and on the parser's error recovery
/// behavior (one error per broken line, no cascades).
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_str(source: &str) -> Result<Program, Vec<SyntaxError>> {
        let tokens = lexer::lex(source)?;
        parse(&tokens)
    }

    fn first_stmt(source: &str) -> Statement {
        let program = parse_str(source).unwrap();
        program.statements.into_iter().next().unwrap().node
    }

    fn first_expr(source: &str) -> Expr {
        match first_stmt(source) {
            Statement::Expr(e) => e.node,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_indent_at_toplevel_is_single_clear_error() {
        let err = parse_str("  x = 1\n").expect_err("Top-level indentation should be rejected");
        assert_eq!(err.len(), 1, "Parser should return exactly one error (no cascade)");
        assert!(err[0].message.contains("Unexpected indentation"));
    }

    #[test]
    fn test_errors_collected_per_line() {
        let err = parse_str("x =\ny = 2\nz = 3 +\n").unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err[0].message.contains("Expected expression"));
        assert!(err[0].message.contains("end of line"));
    }

    #[test]
    fn test_two_broken_lines_two_errors() {
        let err = parse_str("x = = 1\ny = 2\nz = * 3\n").unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_parse_assignment_and_tuple_unpack() {
        match first_stmt("train, valid = generate()\n") {
            Statement::Assign(a) => {
                assert_eq!(a.targets.len(), 1);
                match &a.targets[0].node {
                    Target::Tuple(items) => assert_eq!(items.len(), 2),
                    other => panic!("Expected tuple target, got {:?}", other),
                }
                assert!(matches!(a.value.node, Expr::Call(_, _)));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chained_assignment() {
        match first_stmt("a = b = 0\n") {
            Statement::Assign(a) => assert_eq!(a.targets.len(), 2),
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_attribute_and_index_targets() {
        assert!(matches!(
            first_stmt("obj.attr = 1\n"),
            Statement::Assign(a) if matches!(a.targets[0].node, Target::Attribute(_, ref n) if n == "attr")
        ));
        assert!(matches!(
            first_stmt("d['k'] = 1\n"),
            Statement::Assign(a) if matches!(a.targets[0].node, Target::Index(_, _))
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_str("f() = 1\n").unwrap_err();
        assert!(err[0].message.contains("Invalid assignment target"));
    }

    #[test]
    fn test_parse_aug_assign() {
        match first_stmt("total += x * 2\n") {
            Statement::AugAssign(a) => {
                assert_eq!(a.op, BinaryOp::Add);
                assert!(matches!(a.target.node, Target::Name(ref n) if n == "total"));
            }
            other => panic!("Expected augmented assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        match first_stmt("import os.path as osp, random\n") {
            Statement::Import(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].dotted(), "os.path");
                assert_eq!(items[0].alias.as_deref(), Some("osp"));
                assert_eq!(items[1].alias, None);
            }
            other => panic!("Expected import, got {:?}", other),
        }

        match first_stmt("from mock import (patch,\n    MagicMock as MM)\n") {
            Statement::FromImport(f) => {
                assert_eq!(f.module, vec!["mock".to_string()]);
                assert_eq!(f.names.len(), 2);
                assert_eq!(f.names[1].alias.as_deref(), Some("MM"));
            }
            other => panic!("Expected from-import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_with_defaults_and_keyword_only() {
        let source = "def fit(x, epochs: int = 1, *, batch_size=32) -> None:\n    return x\n";
        match first_stmt(source) {
            Statement::FunctionDef(f) => {
                assert_eq!(f.name, "fit");
                assert_eq!(f.params.len(), 3);
                assert!(f.params[1].node.default.is_some());
                assert!(!f.params[1].node.keyword_only);
                assert!(f.params[2].node.keyword_only);
                assert_eq!(f.body.len(), 1);
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elif_else() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\ny = 4\n";
        let program = parse_str(source).unwrap();
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].node {
            Statement::If(i) => {
                assert_eq!(i.elif_branches.len(), 1);
                assert!(i.else_body.is_some());
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_suite() {
        let program = parse_str("for i in range(3): total += i\nprint(total)\n").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(&program.statements[0].node, Statement::For(f) if f.body.len() == 1));
    }

    #[test]
    fn test_parse_for_tuple_target() {
        match first_stmt("for i, (a, b) in enumerate(pairs):\n    pass\n") {
            Statement::For(f) => match &f.target.node {
                Target::Tuple(items) => {
                    assert_eq!(items.len(), 2);
                    assert!(matches!(items[1].node, Target::Tuple(_)));
                }
                other => panic!("Expected tuple target, got {:?}", other),
            },
            other => panic!("Expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_assert_raise_del() {
        assert!(matches!(first_stmt("assert x == 1, 'bad'\n"), Statement::Assert(a) if a.message.is_some()));
        assert!(matches!(first_stmt("raise ValueError('no')\n"), Statement::Raise(Some(_))));
        assert!(matches!(first_stmt("del a, b[0]\n"), Statement::Del(t) if t.len() == 2));
    }

    #[test]
    fn test_precedence() {
        // -2 ** 2 parses as -(2 ** 2)
        match first_expr("-2 ** 2\n") {
            Expr::Unary(UnaryOp::Neg, inner) => {
                assert!(matches!(inner.node, Expr::Binary(_, BinaryOp::Pow, _)));
            }
            other => panic!("Expected unary negation, got {:?}", other),
        }
        // a or b and not c
        match first_expr("a or b and not c\n") {
            Expr::Binary(_, BinaryOp::Or, right) => {
                assert!(matches!(right.node, Expr::Binary(_, BinaryOp::And, _)));
            }
            other => panic!("Expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_word_operators() {
        assert!(matches!(first_expr("a not in b\n"), Expr::Binary(_, BinaryOp::NotIn, _)));
        assert!(matches!(first_expr("a is not None\n"), Expr::Binary(_, BinaryOp::IsNot, _)));
    }

    #[test]
    fn test_conditional_expression() {
        match first_expr("'yes' if flag else 'no'\n") {
            Expr::Conditional(c) => {
                assert!(matches!(c.condition.node, Expr::Ident(ref n) if n == "flag"));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_calls_and_method_calls() {
        match first_expr("patch('a.b', return_value=[x, y]).start()\n") {
            Expr::MethodCall(receiver, name, args) => {
                assert_eq!(name, "start");
                assert!(args.is_empty());
                match &receiver.node {
                    Expr::Call(_, args) => {
                        assert!(matches!(args[0], CallArg::Positional(_)));
                        assert!(matches!(&args[1], CallArg::Named(n, _) if n == "return_value"));
                    }
                    other => panic!("Expected call, got {:?}", other),
                }
            }
            other => panic!("Expected method call, got {:?}", other),
        }
    }

    #[test]
    fn test_positional_after_keyword_rejected() {
        let err = parse_str("f(a=1, 2)\n").unwrap_err();
        assert!(err[0].message.contains("Positional argument follows keyword argument"));
    }

    #[test]
    fn test_multiline_call_arguments() {
        let source = "model.fit(\n    train,\n    validation_data=valid,\n    epochs=1,\n)\n";
        match first_expr(source) {
            Expr::MethodCall(_, name, args) => {
                assert_eq!(name, "fit");
                assert_eq!(args.len(), 3);
            }
            other => panic!("Expected method call, got {:?}", other),
        }
    }

    #[test]
    fn test_slices() {
        match first_expr("xs[1:-1]\n") {
            Expr::Slice(_, s) => {
                assert!(s.start.is_some());
                assert!(s.end.is_some());
                assert!(s.step.is_none());
            }
            other => panic!("Expected slice, got {:?}", other),
        }
        assert!(matches!(first_expr("xs[::2]\n"), Expr::Slice(_, s) if s.step.is_some() && s.start.is_none()));
    }

    #[test]
    fn test_collections_and_comprehensions() {
        assert!(matches!(first_expr("[]\n"), Expr::List(v) if v.is_empty()));
        assert!(matches!(first_expr("(1,)\n"), Expr::Tuple(v) if v.len() == 1));
        assert!(matches!(first_expr("{1, 2}\n"), Expr::Set(v) if v.len() == 2));
        assert!(matches!(first_expr("{'a': 1, 'b': 2,}\n"), Expr::Dict(v) if v.len() == 2));
        assert!(matches!(first_expr("[x * 2 for x in xs if x > 0]\n"), Expr::ListComp(c) if c.filter.is_some()));
        assert!(matches!(first_expr("{k: v for k, v in pairs}\n"), Expr::DictComp(_)));
        assert!(matches!(
            first_expr("sum(x for x in xs)\n"),
            Expr::Call(_, args) if matches!(&args[0], CallArg::Positional(e) if matches!(e.node, Expr::ListComp(_)))
        ));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(
            first_expr("'a' \"b\"\n"),
            Expr::Literal(Literal::String(s)) if s == "ab"
        ));
    }

    #[test]
    fn test_fstring_fields_are_parsed() {
        match first_expr("f'{name.upper()} has {n:.2f}'\n") {
            Expr::FString(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[0], FStringPart::Expr { expr, format_spec: None } if matches!(expr.node, Expr::MethodCall(..))));
                assert!(matches!(&parts[2], FStringPart::Expr { format_spec: Some(s), .. } if s == ".2f"));
            }
            other => panic!("Expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_fstring_field() {
        let err = parse_str("f'{1 +}'\n").unwrap_err();
        assert!(err[0].message.contains("Invalid expression in f-string"));
    }

    #[test]
    fn test_statement_spans_cover_line() {
        let program = parse_str("x = 1\nlonger_name = 22\n").unwrap();
        assert_eq!(program.statements[1].span, Span::new(6, 22));
    }

    #[test]
    fn test_two_statements_on_one_line_rejected() {
        let err = parse_str("x = 1 y = 2\n").unwrap_err();
        assert!(err[0].message.contains("Expected end of line"));
    }

    #[test]
    fn test_deep_parentheses_rejected_without_overflow() {
        let source = format!("x = {}1{}\n", "(".repeat(3000), ")".repeat(3000));
        let err = parse_str(&source).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].message.contains("too many nested"));
    }

    #[test]
    fn test_nesting_below_limit_parses() {
        let depth = MAX_NESTING - 10;
        let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_str(&source).is_ok());
        assert!(parse_str(&format!("y = {}1\n", "-".repeat(depth))).is_ok());
    }

    #[test]
    fn test_deep_unary_chain_rejected() {
        let err = parse_str(&format!("y = {}1\n", "not ".repeat(5000))).unwrap_err();
        assert!(err[0].message.contains("too many nested"));
    }

    #[test]
    fn test_deep_blocks_rejected() {
        let mut source = String::new();
        for level in 0..(MAX_NESTING + 5) {
            source.push_str(&format!("{}if True:\n", " ".repeat(level)));
        }
        source.push_str(&format!("{}pass\n", " ".repeat(MAX_NESTING + 5)));
        let err = parse_str(&source).unwrap_err();
        assert!(err.iter().any(|e| e.message.contains("too many nested")));
    }
}
