//! Parser tests: precedence shapes, `for` desugaring, error recovery.

use rox::ast::{Expr, LiteralValue, Stmt};
use rox::error::Diagnostics;
use rox::parser::Parser;
use rox::scanner;

fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(source.as_bytes(), &mut diagnostics);
    let statements = Parser::new(&tokens, &mut diagnostics).parse();

    let errors = diagnostics.errors().iter().map(ToString::to_string).collect();
    (statements, errors)
}

fn parse_ok(source: &str) -> Vec<Stmt> {
    let (statements, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
    statements
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let statements = parse_ok("1 + 2 * 3;");

    let Stmt::Expression(Expr::Binary {
        left,
        operator,
        right,
    }) = &statements[0]
    else {
        panic!("expected binary expression statement");
    };

    assert_eq!(operator.lexeme, "+");
    assert!(matches!(**left, Expr::Literal(LiteralValue::Number(n)) if n == 1.0));
    assert!(matches!(
        **right,
        Expr::Binary { ref operator, .. } if operator.lexeme == "*"
    ));
}

#[test]
fn assignment_is_right_associative() {
    let statements = parse_ok("a = b = 1;");

    let Stmt::Expression(Expr::Assign { name, value, .. }) = &statements[0] else {
        panic!("expected assignment");
    };

    assert_eq!(name.lexeme, "a");
    assert!(matches!(**value, Expr::Assign { ref name, .. } if name.lexeme == "b"));
}

#[test]
fn calls_and_property_access_chain_left_associatively() {
    let statements = parse_ok("a.b(1).c;");

    // ((a.b)(1)).c
    let Stmt::Expression(Expr::Get { object, name }) = &statements[0] else {
        panic!("expected property get");
    };
    assert_eq!(name.lexeme, "c");

    let Expr::Call {
        callee, arguments, ..
    } = &**object
    else {
        panic!("expected call under the get");
    };
    assert_eq!(arguments.len(), 1);
    assert!(matches!(**callee, Expr::Get { ref name, .. } if name.lexeme == "b"));
}

#[test]
fn for_desugars_into_while_wrapped_in_blocks() {
    let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected enclosing block from desugaring");
    };
    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { ref name, .. } if name.lexeme == "i"));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while loop");
    };

    // Increment appended to the loop body.
    let Stmt::Block(inner) = &**body else {
        panic!("expected block body carrying the increment");
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_without_condition_defaults_to_true() {
    let statements = parse_ok("for (;;) {}");

    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("expected bare while from desugaring");
    };

    assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
}

#[test]
fn class_declaration_with_superclass_and_methods() {
    let statements = parse_ok("class B < A { one() {} two(x) {} }");

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected class declaration");
    };

    assert_eq!(name.lexeme, "B");

    let Some(Expr::Variable {
        name: super_name, ..
    }) = superclass
    else {
        panic!("expected superclass reference");
    };
    assert_eq!(super_name.lexeme, "A");
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[1].params.len(), 1);
}

#[test]
fn super_access_parses() {
    let statements = parse_ok("class B < A { m() { return super.m(); } }");
    assert_eq!(statements.len(), 1);
}

#[test]
fn invalid_assignment_target_is_reported_but_not_fatal() {
    let (statements, errors) = parse("1 = 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Invalid assignment target"));

    // The expression still parsed; the statement is not dropped.
    assert_eq!(statements.len(), 1);
}

#[test]
fn resynchronization_surfaces_multiple_errors() {
    let source = "var 1;\nprint \"ok\";\n+;\nprint 2;";
    let (statements, errors) = parse(source);

    assert_eq!(errors.len(), 2, "errors: {errors:?}");
    assert!(errors[0].contains("Expected variable name"));
    assert!(errors[1].contains("Expected expression"));

    // Both healthy statements survived around the bad ones.
    assert_eq!(statements.len(), 2);
    assert!(matches!(statements[0], Stmt::Print(_)));
    assert!(matches!(statements[1], Stmt::Print(_)));
}

#[test]
fn error_location_names_the_offending_lexeme() {
    let (_, errors) = parse("var 1;");
    assert!(errors[0].contains("at '1'"), "got: {}", errors[0]);

    let (_, errors) = parse("print 1");
    assert!(errors[0].contains("at end"), "got: {}", errors[0]);
}
