use super::*;

fn body(snippet: &str) -> Vec<Stmt> {
    parse_function(&format!("void f() {{\n{snippet}\n}}\n"))
        .unwrap()
        .body
}

fn parse_err(snippet: &str) -> ScriptError {
    parse_function(&format!("void f() {{\n{snippet}\n}}\n")).unwrap_err()
}

fn single_expr(snippet: &str) -> Expr {
    match body(snippet).remove(0).kind {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn parses_function_header() {
    let f = parse_function("void filter_3() { }").unwrap();
    assert_eq!(f.name, "filter_3");
    assert!(f.body.is_empty());
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let e = single_expr("x = 1 + 2 * 3;");
    let ExprKind::Assign { value, op: None, .. } = e.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, right, .. } = value.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn assignment_is_right_associative() {
    let e = single_expr("a = b += 2;");
    let ExprKind::Assign { target, value, .. } = e.kind else {
        panic!("expected assignment");
    };
    assert_eq!(target, "a");
    assert!(matches!(
        value.kind,
        ExprKind::Assign { op: Some(BinaryOp::Add), .. }
    ));
}

#[test]
fn cast_and_ternary() {
    let e = single_expr("x = (int) (y > 0 ? 1.5 : 2.5);");
    let ExprKind::Assign { value, .. } = e.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Cast { ty, expr } = value.kind else {
        panic!("expected cast");
    };
    assert_eq!(ty, ScalarType::Int);
    assert!(matches!(expr.kind, ExprKind::Ternary { .. }));
}

#[test]
fn dotted_call_keeps_qualified_name() {
    let e = single_expr("setRGB(x, y, Math.max(1, 2));");
    let ExprKind::Call { func, args } = e.kind else {
        panic!("expected call");
    };
    assert_eq!(func, "setRGB");
    assert_eq!(args.len(), 3);
    assert!(matches!(&args[2].kind, ExprKind::Call { func, .. } if func == "Math.max"));
}

#[test]
fn for_loop_with_declaration_and_updates() {
    let stmts = body("for (int x = 0, y = 1; x < 10; x++, y--) { }");
    let StmtKind::For {
        init,
        cond,
        update,
        ..
    } = &stmts[0].kind
    else {
        panic!("expected for");
    };
    assert!(matches!(&init[0].kind, StmtKind::Local { vars, .. } if vars.len() == 2));
    assert!(cond.is_some());
    assert_eq!(update.len(), 2);
}

#[test]
fn do_while_and_if_else() {
    let stmts = body("do { x++; } while (x < 3); if (x == 3) x = 0; else { x = 1; }");
    assert!(matches!(stmts[0].kind, StmtKind::DoWhile { .. }));
    assert!(matches!(stmts[1].kind, StmtKind::If { els: Some(_), .. }));
}

#[test]
fn missing_initializer_is_illegal_start_of_expression() {
    let err = parse_err("int x = ;");
    assert_eq!(err.message, "illegal start of expression");
    // `;` sits after "void f() {\n" plus "int x = ".
    assert_eq!(err.offset, 11 + 8);
}

#[test]
fn missing_semicolon_points_after_previous_token() {
    let err = parse_err("int x = 5\nint y = 6;");
    assert!(err.message.starts_with("';' expected"), "{}", err.message);
    assert_eq!(err.offset, 11 + 9);
}

#[test]
fn unbalanced_braces_reach_end_of_file() {
    let err = parse_err("for (int i = 0; i < 3; i++) {");
    assert_eq!(err.message, "reached end of file while parsing");
}

#[test]
fn extra_closing_brace_is_reported() {
    let err = parse_err("x = 1; }");
    assert!(err.message.contains("after the end of the filter body"));
}

#[test]
fn bare_expression_is_not_a_statement() {
    assert_eq!(parse_err("x + 1;").message, "not a statement");
}

#[test]
fn increment_needs_a_variable() {
    let err = parse_err("5++;");
    assert!(err.message.contains("required variable"));
}

#[test]
fn deep_nesting_is_rejected_without_overflow() {
    let src = format!("x = {}1{};", "(".repeat(5000), ")".repeat(5000));
    assert_eq!(parse_err(&src).message, "code is nested too deeply");
}

#[test]
fn long_operator_chains_count_toward_nesting() {
    let ok = format!("x = 1{};", " + 1".repeat(100));
    assert!(parse_function(&format!("void f() {{\n{ok}\n}}\n")).is_ok());

    let src = format!("x = 1{};", " + 1".repeat(50_000));
    assert_eq!(parse_err(&src).message, "code is nested too deeply");
}

#[test]
fn min_int_literal_only_under_unary_minus() {
    match single_expr("x = -2147483648;").kind {
        ExprKind::Assign { value, .. } => assert_eq!(value.kind, ExprKind::Int(i32::MIN)),
        other => panic!("expected assignment, got {other:?}"),
    }
    assert_eq!(parse_err("x = 2147483648;").message, "integer number too large");
    assert_eq!(parse_err("x = -(2147483648);").message, "integer number too large");
    assert_eq!(parse_err("x = 1 - 2147483648;").message, "integer number too large");
}
