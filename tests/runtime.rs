//! Runtime behavior tests.
//!
//! `run` drives the full pipeline with a captured `print` sink and returns
//! what the program wrote; `run_err` stops at the first runtime error and
//! returns its rendered message.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::Diagnostics;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner;
use rox::{run_source, RunStatus};

// ─── Helpers ─────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn run(source: &str) -> String {
    let output = SharedOutput::default();
    let mut interpreter = Interpreter::with_output(Box::new(output.clone()));

    let status = run_source(source.as_bytes(), &mut interpreter);
    assert_eq!(status, RunStatus::Ok, "program failed:\n{source}");

    output.text()
}

fn run_status(source: &str) -> (RunStatus, String) {
    let output = SharedOutput::default();
    let mut interpreter = Interpreter::with_output(Box::new(output.clone()));

    let status = run_source(source.as_bytes(), &mut interpreter);
    (status, output.text())
}

fn run_err(source: &str) -> String {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(source.as_bytes(), &mut diagnostics);
    let statements = Parser::new(&tokens, &mut diagnostics).parse();
    assert!(!diagnostics.had_errors(), "unexpected static errors");

    let mut interpreter = Interpreter::with_output(Box::new(SharedOutput::default()));
    Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
    assert!(!diagnostics.had_errors(), "unexpected resolve errors");

    interpreter
        .interpret(&statements)
        .expect_err("expected a runtime error")
        .to_string()
}

// ─── Arithmetic and printing ─────────────────────────────────────────────────

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(run("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn division_produces_fractions() {
    assert_eq!(run("print 10 / 4;"), "2.5\n");
}

#[test]
fn integral_numbers_print_without_decimal_point() {
    assert_eq!(run("print 7.0;"), "7\n");
    assert_eq!(run("print -0.5 * 2;"), "-1\n");
}

#[test]
fn division_by_zero_follows_ieee754() {
    // Not an error: the quotient is infinite.
    assert_eq!(run("print 1 / 0;"), "inf\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn mixed_plus_operands_are_an_error() {
    let message = run_err("print 1 + \"a\";");
    assert!(message.contains("Operands must be two numbers or two strings."));
}

#[test]
fn comparison_requires_numbers() {
    let message = run_err("print \"a\" < \"b\";");
    assert!(message.contains("Operands must be numbers"));
}

#[test]
fn nil_prints_as_nil() {
    assert_eq!(run("print nil;"), "nil\n");
}

// ─── Truthiness, equality, logic ─────────────────────────────────────────────

#[test]
fn zero_and_empty_string_are_truthy() {
    assert_eq!(run("if (0) print \"zero\";"), "zero\n");
    assert_eq!(run("if (\"\") print \"empty\";"), "empty\n");
}

#[test]
fn equality_rules() {
    assert_eq!(run("print nil == nil;"), "true\n");
    assert_eq!(run("print 1 == \"1\";"), "false\n");
    assert_eq!(run("print \"a\" == \"a\";"), "true\n");
}

#[test]
fn logical_operators_return_operand_values() {
    assert_eq!(run("print nil or \"yes\";"), "yes\n");
    assert_eq!(run("print 0 and 1;"), "1\n");
    assert_eq!(run("print false or false;"), "false\n");
}

#[test]
fn and_short_circuits() {
    let output = run(
        "var called = false;\n\
         fun mark() { called = true; return true; }\n\
         print false and mark();\n\
         print called;",
    );
    assert_eq!(output, "false\nfalse\n");
}

// ─── Scoping and closures ────────────────────────────────────────────────────

#[test]
fn block_scoping_shadows_and_restores() {
    let output = run("var a = 1; { var a = 2; print a; } print a;");
    assert_eq!(output, "2\n1\n");
}

#[test]
fn closures_share_their_captured_environment() {
    let output = run(
        "fun makeCounter() {\n\
           var n = 0;\n\
           fun increment() { n = n + 1; return n; }\n\
           return increment;\n\
         }\n\
         var counter = makeCounter();\n\
         print counter();\n\
         print counter();",
    );
    assert_eq!(output, "1\n2\n");
}

#[test]
fn resolved_distances_pin_captured_bindings() {
    // The closure must keep seeing the 'a' it captured, not the later global.
    let output = run(
        "var a = \"global\";\n\
         {\n\
           fun show() { print a; }\n\
           show();\n\
           var a = \"block\";\n\
           show();\n\
         }",
    );
    assert_eq!(output, "global\nglobal\n");
}

// ─── Functions ───────────────────────────────────────────────────────────────

#[test]
fn return_unwinds_immediately() {
    let output = run("fun f() { return 1; print \"unreachable\"; } print f();");
    assert_eq!(output, "1\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
}

#[test]
fn recursion_works() {
    let output = run(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
         print fib(10);",
    );
    assert_eq!(output, "55\n");
}

#[test]
fn arity_mismatch_names_expected_and_actual() {
    let message = run_err("fun f() {} f(1);");
    assert!(message.contains("Expected 0 arguments but got 1."), "got: {message}");
}

#[test]
fn calling_a_non_callable_is_an_error() {
    let message = run_err("\"str\"();");
    assert!(message.contains("Can only call functions and classes."));
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let message = run_err("print q;");
    assert!(message.contains("Undefined variable 'q'."));
}

#[test]
fn clock_native_is_available() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}

// ─── Classes ─────────────────────────────────────────────────────────────────

#[test]
fn fields_are_created_on_first_write() {
    let output = run("class Box {} var b = Box(); b.v = 3; print b.v;");
    assert_eq!(output, "3\n");
}

#[test]
fn undefined_property_is_a_runtime_error() {
    let message = run_err("class A {} print A().missing;");
    assert!(message.contains("Undefined property 'missing'."));
}

#[test]
fn property_access_on_a_non_instance_is_an_error() {
    let message = run_err("var x = 1; print x.y;");
    assert!(message.contains("Only instances have properties."));
}

#[test]
fn initializer_binds_this_and_sets_fields() {
    let output = run(
        "class Point { init(x) { this.x = x; } }\n\
         var p = Point(5);\n\
         print p.x;\n\
         print p;",
    );
    assert_eq!(output, "5\nPoint instance\n");
}

#[test]
fn class_arity_comes_from_init() {
    let message = run_err("class Point { init(x, y) {} } Point(1);");
    assert!(message.contains("Expected 2 arguments but got 1."));
}

#[test]
fn methods_dispatch_through_the_superclass_chain() {
    let output = run(
        "class A { greet() { return \"hi\"; } }\n\
         class B < A {}\n\
         print B().greet();",
    );
    assert_eq!(output, "hi\n");
}

#[test]
fn super_starts_lookup_one_level_up() {
    let output = run(
        "class A { m() { return \"A\"; } }\n\
         class B < A { m() { return \"B > \" + super.m(); } }\n\
         print B().m();",
    );
    assert_eq!(output, "B > A\n");
}

#[test]
fn superclass_must_be_a_class() {
    let message = run_err("var NotAClass = 1; class B < NotAClass {}");
    assert!(message.contains("Superclass must be a class."));
}

#[test]
fn bound_methods_remember_their_instance() {
    let output = run(
        "class Greeter {\n\
           init(name) { this.name = name; }\n\
           greet() { return \"hello \" + this.name; }\n\
         }\n\
         var m = Greeter(\"rox\").greet;\n\
         print m();",
    );
    assert_eq!(output, "hello rox\n");
}

// ─── Loops ───────────────────────────────────────────────────────────────────

#[test]
fn while_loop_runs_until_falsy() {
    let output = run("var i = 0; while (i < 3) { print i; i = i + 1; }");
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn for_loop_desugaring_behaves_like_while() {
    let output = run("var sum = 0; for (var i = 0; i < 4; i = i + 1) sum = sum + i; print sum;");
    assert_eq!(output, "6\n");
}

// ─── Failure semantics ───────────────────────────────────────────────────────

#[test]
fn static_errors_prevent_any_execution() {
    let (status, output) = run_status("print \"never\"; var;");
    assert_eq!(status, RunStatus::StaticError);
    assert!(output.is_empty(), "nothing may run: {output:?}");
}

#[test]
fn resolver_errors_prevent_any_execution() {
    let (status, output) = run_status("print \"never\"; return 1;");
    assert_eq!(status, RunStatus::StaticError);
    assert!(output.is_empty());
}

#[test]
fn runtime_errors_keep_prior_output() {
    let (status, output) = run_status("print \"before\"; nil.field;");
    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(output, "before\n");
}

#[test]
fn runtime_error_reports_its_line() {
    let message = run_err("var a = 1;\nvar b = 2;\nprint a + \"x\";");
    assert!(message.contains("[line 3]"), "got: {message}");
}
