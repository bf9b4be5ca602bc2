//! Resolver tests.
//!
//! Each test feeds a program through scan → parse → resolve and inspects the
//! accumulated diagnostics; nothing is ever executed.

use rox::error::Diagnostics;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner;

fn analyze(source: &str) -> Vec<String> {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(source.as_bytes(), &mut diagnostics);
    let statements = Parser::new(&tokens, &mut diagnostics).parse();

    assert!(
        !diagnostics.had_errors(),
        "parse failed: {:?}",
        diagnostics.errors()
    );

    let mut interpreter = Interpreter::new();
    Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);

    diagnostics.errors().iter().map(ToString::to_string).collect()
}

fn ok(source: &str) {
    let errors = analyze(source);
    assert!(errors.is_empty(), "expected clean resolve, got: {errors:?}");
}

fn err(source: &str, needle: &str) {
    let errors = analyze(source);
    assert!(
        errors.iter().any(|e| e.contains(needle)),
        "expected an error containing {needle:?}, got: {errors:?}"
    );
}

#[test]
fn return_at_top_level_is_rejected() {
    err("return 1;", "Cannot return from top-level code");
}

#[test]
fn return_inside_function_is_fine() {
    ok("fun f() { return 1; }");
}

#[test]
fn this_outside_a_class_is_rejected() {
    err("print this;", "Cannot use 'this' outside of a class");
    err("fun f() { return this; }", "Cannot use 'this' outside of a class");
}

#[test]
fn this_inside_a_method_is_fine() {
    ok("class A { m() { return this; } }");
}

#[test]
fn class_inheriting_from_itself_is_rejected() {
    err("class A < A {}", "A class cannot inherit from itself");
}

#[test]
fn duplicate_declaration_in_one_block_scope_is_rejected() {
    err(
        "{ var x = 1; var x = 2; }",
        "Already a variable with this name in this scope",
    );
}

#[test]
fn shadowing_in_a_nested_scope_is_fine() {
    ok("{ var x = 1; { var x = 2; } }");
}

#[test]
fn reading_a_local_in_its_own_initializer_is_rejected() {
    err(
        "var a = 1; { var a = a; }",
        "Cannot read local variable in its own initializer",
    );
}

#[test]
fn value_return_from_an_initializer_is_rejected() {
    err(
        "class A { init() { return 42; } }",
        "Cannot return a value from an initializer",
    );
}

#[test]
fn bare_return_from_an_initializer_is_fine() {
    ok("class A { init() { return; } }");
}

#[test]
fn super_in_a_class_without_superclass_is_rejected() {
    err(
        "class A { m() { return super.m(); } }",
        "Cannot use 'super' in a class with no superclass",
    );
}

#[test]
fn super_outside_a_class_is_rejected() {
    err(
        "fun f() { return super.m(); }",
        "Cannot use 'super' outside of a class",
    );
}

#[test]
fn super_in_a_subclass_method_is_fine() {
    ok("class A { m() {} } class B < A { m() { return super.m(); } }");
}

#[test]
fn errors_accumulate_across_the_whole_program() {
    let errors = analyze("return 1;\nprint this;\nclass A < A {}");
    assert_eq!(errors.len(), 3, "errors: {errors:?}");
}

#[test]
fn closures_and_globals_resolve_cleanly() {
    ok("var g = 1;\n\
        fun outer() {\n\
          var n = 0;\n\
          fun inner() { n = n + 1; return n + g; }\n\
          return inner;\n\
        }\n\
        outer()();");
}
