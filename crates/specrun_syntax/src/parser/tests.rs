#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_str(source: &str) -> Result<Program, Vec<CompileError>> {
        let tokens = lexer::lex(source).expect("lexing should succeed");
        parse(&tokens)
    }

    fn parse_ok(source: &str) -> Program {
        match parse_str(source) {
            Ok(program) => program,
            Err(errors) => panic!("parse failed: {:?}", errors),
        }
    }

    fn only_call(program: &Program) -> &CallExpr {
        match &program.statements[0].node {
            Stmt::Expr(Spanned {
                node: Expr::Call(call), ..
            }) => call,
            other => panic!("expected call statement, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_block_call() {
        let program = parse_ok(r#"context("Foo") { spec("works") { assert(true) } }"#);
        assert_eq!(program.statements.len(), 1);

        let call = only_call(&program);
        assert_eq!(call.callee_name(), Some("context"));
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.arity(), 2);

        let body = &call.trailing.as_ref().expect("trailing block").body;
        assert_eq!(body.statements.len(), 1);
    }

    #[test]
    fn test_bare_identifier_trailing_block() {
        let program = parse_ok("before_each { let x = 1 }");
        let call = only_call(&program);
        assert_eq!(call.callee_name(), Some("before_each"));
        assert!(call.args.is_empty());
        assert!(call.trailing.is_some());
    }

    #[test]
    fn test_lambda_argument() {
        let program = parse_ok(r#"spec("adds", fn() { assert_eq(1 + 1, 2) })"#);
        let call = only_call(&program);
        assert_eq!(call.args.len(), 2);
        assert!(call.trailing.is_none());
        assert!(matches!(call.args[1].node, Expr::Lambda(_)));
    }

    #[test]
    fn test_if_header_does_not_take_trailing_block() {
        let program = parse_ok("if ready { print(1) } else if other { print(2) } else { print(3) }");
        match &program.statements[0].node {
            Stmt::If(if_stmt) => {
                assert!(matches!(if_stmt.condition.node, Expr::Ident(_)));
                assert!(matches!(if_stmt.else_branch, Some(ElseBranch::If(_))));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_while_header_call_condition() {
        let program = parse_ok("while more(items) { items = rest(items) }");
        match &program.statements[0].node {
            Stmt::While(w) => {
                match &w.condition.node {
                    Expr::Call(call) => assert!(call.trailing.is_none()),
                    other => panic!("expected call condition, got {:?}", other),
                }
                assert_eq!(w.body.statements.len(), 1);
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_for_loop() {
        let program = parse_ok("for x in [1, 2, 3] { print(x) }");
        match &program.statements[0].node {
            Stmt::For(f) => {
                assert_eq!(f.binding.node, "x");
                assert!(matches!(&f.iterable.node, Expr::List(items) if items.len() == 3));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("let x = 1 + 2 * 3 == 7 && !false");
        let Stmt::Let(let_stmt) = &program.statements[0].node else {
            panic!("expected let");
        };
        let value = let_stmt.value.as_ref().expect("initializer");
        let Expr::Binary(lhs, BinaryOp::And, rhs) = &value.node else {
            panic!("expected && at the root, got {:?}", value.node);
        };
        assert!(matches!(lhs.node, Expr::Binary(_, BinaryOp::Eq, _)));
        assert!(matches!(rhs.node, Expr::Unary(UnaryOp::Not, _)));
    }

    #[test]
    fn test_left_associative_subtraction() {
        let program = parse_ok("10 - 3 - 2");
        let Stmt::Expr(expr) = &program.statements[0].node else {
            panic!("expected expression");
        };
        let Expr::Binary(lhs, BinaryOp::Sub, rhs) = &expr.node else {
            panic!("expected subtraction");
        };
        assert!(matches!(lhs.node, Expr::Binary(_, BinaryOp::Sub, _)));
        assert!(matches!(rhs.node, Expr::Literal(Literal::Int(2))));
    }

    #[test]
    fn test_function_declaration_and_return() {
        let program = parse_ok("fn add(a, b) { return a + b }\nfn noop() { return }");
        let Stmt::Fn(add) = &program.statements[0].node else {
            panic!("expected fn");
        };
        assert_eq!(add.name.as_deref(), Some("add"));
        assert_eq!(add.params.len(), 2);

        let Stmt::Fn(noop) = &program.statements[1].node else {
            panic!("expected fn");
        };
        assert!(matches!(noop.body.statements[0].node, Stmt::Return(None)));
    }

    #[test]
    fn test_assignment_targets() {
        let program = parse_ok("let xs = [1]; xs[0] = 2; xs = []");
        assert_eq!(program.statements.len(), 3);
        assert!(matches!(program.statements[1].node, Stmt::Assign(_)));

        let errors = parse_str("f() = 1").expect_err("call is not assignable");
        assert!(errors[0].message.contains("Invalid assignment target"));
    }

    #[test]
    fn test_field_access_call() {
        let program = parse_ok("math.abs(-3)");
        let call = only_call(&program);
        assert!(matches!(call.callee.node, Expr::Field(_, _)));
        assert!(call.callee_name().is_none());
    }

    #[test]
    fn test_reports_multiple_errors() {
        let errors = parse_str("let = 1;\nspec(\"a\") { let }\nlet ok = 2").expect_err("should fail");
        assert_eq!(errors.len(), 2, "{:?}", errors);
    }

    #[test]
    fn test_unclosed_block() {
        let errors = parse_str("context(\"a\") {").expect_err("should fail");
        assert!(errors.iter().any(|e| e.message.contains("to close block")));
    }

    #[test]
    fn test_stray_closing_brace_does_not_stall() {
        let errors = parse_str("} } print(1)").expect_err("should fail");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_stack_overflow() {
        let parens = format!("let x = {}1{}", "(".repeat(2_000), ")".repeat(2_000));
        let errors = parse_str(&parens).expect_err("should fail");
        assert!(errors[0].message.contains("nested too deeply"), "{:?}", errors);

        let negations = format!("let y = {}1", "-".repeat(2_000));
        let errors = parse_str(&negations).expect_err("should fail");
        assert!(errors[0].message.contains("nested too deeply"));

        let blocks = format!("{}{}", "if true {".repeat(500), "}".repeat(500));
        let errors = parse_str(&blocks).expect_err("should fail");
        assert!(errors.iter().any(|e| e.message.contains("nested too deeply")));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let source = format!("let x = {}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse_ok(&source).statements.len(), 1);
    }

    #[test]
    fn test_statement_spans_cover_source() {
        let source = "let x = 1";
        let program = parse_ok(source);
        assert_eq!(program.statements[0].span, Span::new(0, source.len()));
    }
}
