use std::rc::Rc;

use pretty_assertions::assert_eq;
use rstest::rstest;

use beamscript::error::Phase;
use beamscript::value::Value;
use beamscript::{run_with_console, BeamError, BufferConsole, ErrorKind};

fn eval(source: &str) -> Value {
    run_with_console(source, Rc::new(BufferConsole::new())).expect("Execution failed")
}

fn eval_err(source: &str) -> BeamError {
    match run_with_console(source, Rc::new(BufferConsole::new())) {
        Ok(value) => panic!("Expected error, got {:?}", value),
        Err(err) => err,
    }
}

fn number(value: &Value) -> (f64, bool) {
    match value {
        Value::Number(n) => (n.value, n.is_float),
        other => panic!("Expected number, got {:?}", other),
    }
}

#[rstest]
#[case("5", 5.0, false)]
#[case("5.0", 5.0, true)]
#[case("2.", 2.0, true)]
#[case("0.25", 0.25, true)]
#[case("10 / 4", 2.5, true)]
#[case("6 / 3", 2.0, true)]
#[case("2 * 3.0", 6.0, true)]
#[case("7 % 4", 3.0, false)]
#[case("2 ^ 10", 1024.0, false)]
#[case("1 + 2 * 3", 7.0, false)]
#[case("(1 + 2) * 3", 9.0, false)]
#[case("2 ^ 3 ^ 2", 64.0, false)]
fn test_numeric_results(#[case] source: &str, #[case] expected: f64, #[case] is_float: bool) {
    assert_eq!(number(&eval(source)), (expected, is_float));
}

#[test]
fn test_empty_program_is_null() {
    assert_eq!(eval(""), Value::Null);
    assert_eq!(eval("// only a comment"), Value::Null);
}

#[test]
fn test_declare_and_assign() {
    assert_eq!(eval("declare x = 1 x = 2 x"), Value::int(2));
    assert_eq!(eval("var a = 1, b = 2; a + b"), Value::int(3));
    assert_eq!(eval("declare y y"), Value::Null);
}

#[test]
fn test_assignment_yields_value() {
    assert_eq!(eval("declare x = 0 declare y = x = 4 y"), Value::int(4));
}

#[test]
fn test_const_assignment_fails() {
    let err = eval_err("const var x = 1 x = 2");
    assert_eq!(err.kind, ErrorKind::ConstAssignment("x".into()));
    assert_eq!(err.kind.phase(), Phase::Runtime);
}

#[test]
fn test_const_without_initializer() {
    let err = eval_err("const declare x");
    assert_eq!(err.kind, ErrorKind::ConstWithoutInitializer("x".into()));
    assert_eq!(err.kind.phase(), Phase::Parse);
}

#[test]
fn test_duplicate_declaration() {
    let err = eval_err("declare x = 1 declare x = 2");
    assert_eq!(err.kind, ErrorKind::DuplicateDeclaration("x".into()));
}

#[test]
fn test_undeclared_variable() {
    let err = eval_err("y = 3");
    assert_eq!(err.kind, ErrorKind::UndeclaredVariable("y".into()));
    let err = eval_err("missing");
    assert_eq!(err.kind, ErrorKind::UndeclaredVariable("missing".into()));
}

#[test]
fn test_invalid_assignment_target() {
    let err = eval_err("declare o = { a: 1 } o.a = 2");
    assert_eq!(err.kind, ErrorKind::InvalidAssignmentTarget);
}

#[test]
fn test_if_else() {
    assert_eq!(eval("if 2 > 1 { 10 } else { 20 }"), Value::int(10));
    assert_eq!(eval("if 1 > 2 { 10 } else { 20 }"), Value::int(20));
    assert_eq!(eval("if 1 > 2 { 10 }"), Value::Null);
}

#[test]
fn test_else_if_chain() {
    let source = r#"
        declare n = 15
        declare label = null
        if n < 10 {
            label = "small"
        } else if n < 20 {
            label = "medium"
        } else {
            label = "large"
        }
        label
    "#;
    assert_eq!(eval(source), Value::string("medium"));
}

#[test]
fn test_while_loop() {
    assert_eq!(eval("declare i = 0 while i < 3 { i = i + 1 } i"), Value::int(3));
}

#[test]
fn test_while_never_runs() {
    assert_eq!(eval("declare i = 5 while i < 3 { i = i + 1 } i"), Value::int(5));
}

#[test]
fn test_blocks_share_scope() {
    assert_eq!(eval("if true { declare inner = 7 } inner"), Value::int(7));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(eval_err("1 / 0").kind, ErrorKind::DivisionByZero);
    assert_eq!(eval_err("1 % 0").kind, ErrorKind::DivisionByZero);
}

#[test]
fn test_non_numeric_operands_yield_null() {
    assert_eq!(eval("'a' + 1"), Value::Null);
    assert_eq!(eval("null * 2"), Value::Null);
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("1 == 1.0"), Value::Boolean(true));
    assert_eq!(eval("1 != 2"), Value::Boolean(true));
    assert_eq!(eval("3 <= 2"), Value::Boolean(false));
    assert_eq!(eval("3 >= 3"), Value::Boolean(true));
}

#[test]
fn test_and_compares_number_kind() {
    assert_eq!(eval("2 and 2"), Value::int(2));
    assert_eq!(eval("2 and 2.0"), Value::Boolean(false));
}

#[test]
fn test_and_compares_objects_without_order() {
    let source = r#"
        declare a = { x: 1, y: 2 }
        declare b = { y: 2, x: 1 }
        a and b
    "#;
    assert_eq!(eval(source).to_string(), "{ x: 1, y: 2 }");
    assert_eq!(
        eval("declare a = { x: 1 } declare b = { x: 1.0 } a and b"),
        Value::Boolean(false)
    );
}

#[test]
fn test_logical_operators() {
    assert_eq!(eval("true and true"), Value::Boolean(true));
    assert_eq!(eval("true && false"), Value::Boolean(false));
    assert_eq!(eval("false or 5"), Value::int(5));
    assert_eq!(eval("true || 5"), Value::Boolean(true));
    assert_eq!(eval("not false"), Value::Boolean(true));
}

#[test]
fn test_unary_minus() {
    assert_eq!(eval("declare x = -5 x"), Value::int(-5));
    assert_eq!(eval("3 - (-2)"), Value::int(5));
}

#[test]
fn test_member_access() {
    let source = r#"
        declare obj = { a: 1, b: { c: "deep" } }
        obj.b.c
    "#;
    assert_eq!(eval(source), Value::string("deep"));
    assert_eq!(eval("declare o = { a: 1 } o['a']"), Value::int(1));
}

#[test]
fn test_computed_member_with_number_key() {
    let err = eval_err("declare o = { a: 1 } o[1]");
    assert_eq!(err.kind, ErrorKind::MemberNotFound("1".into(), "object".into()));
    let err = eval_err("declare o = { a: 1 } o[null]");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(..)));
}

#[test]
fn test_member_not_found() {
    let err = eval_err("declare o = { a: 1 } o.z");
    assert_eq!(err.kind, ErrorKind::MemberNotFound("z".into(), "object".into()));
    let err = eval_err("declare n = 3 n.x");
    assert_eq!(err.kind, ErrorKind::MemberNotFound("x".into(), "number".into()));
}

#[test]
fn test_shorthand_properties() {
    let source = r#"
        declare a = 1, b = "two"
        declare o = { a, b }
        o
    "#;
    assert_eq!(eval(source).to_string(), r#"{ a: 1, b: "two" }"#);
}

#[test]
fn test_function_call() {
    assert_eq!(eval("def f(a, b) { a + b } f(2, 3)"), Value::int(5));
}

#[test]
fn test_extra_arguments_are_ignored() {
    assert_eq!(eval("def f(a) { a } f(1, 2, 3)"), Value::int(1));
}

#[test]
fn test_arity_mismatch() {
    let err = eval_err("def f(a, b) { a + b } f(1)");
    assert_eq!(
        err.kind,
        ErrorKind::ArityMismatch { name: "f".into(), expected: 2, got: 1 }
    );
}

#[test]
fn test_not_callable() {
    let err = eval_err("declare x = 1 x()");
    assert_eq!(err.kind, ErrorKind::NotCallable("number".into()));
}

#[test]
fn test_recursion() {
    let source = r#"
        def fact(n) {
            if n <= 1 { 1 } else { n * fact(n - 1) }
        }
        fact(5)
    "#;
    assert_eq!(eval(source), Value::int(120));
}

#[test]
fn test_runaway_recursion_is_reported() {
    // Same stack as the binary's main thread; test threads default to 2 MiB.
    let kind = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(|| eval_err("def loop(n) { loop(n) } loop(1)").kind)
        .unwrap()
        .join()
        .unwrap();
    assert!(matches!(kind, ErrorKind::StackOverflow(_)));
}

#[rstest]
#[case("declare x = @", Phase::Lex)]
#[case("'open", Phase::Lex)]
#[case("/* never closed", Phase::Lex)]
#[case("declare = 1", Phase::Parse)]
#[case("def f(1) { }", Phase::Parse)]
#[case("(1 + 2", Phase::Parse)]
#[case("nope", Phase::Runtime)]
fn test_error_phases(#[case] source: &str, #[case] phase: Phase) {
    assert_eq!(eval_err(source).kind.phase(), phase);
}

#[test]
fn test_error_reports_position() {
    let source = "declare x = 1\nx = y";
    let err = eval_err(source).with_source(source);
    let span = err.span.expect("runtime errors carry a span");
    assert_eq!(span.line, 2);
    let rendered = err.to_string();
    assert!(rendered.starts_with("[line 2:"), "{}", rendered);
    assert!(rendered.contains("RuntimeError"), "{}", rendered);
    assert!(rendered.contains("x = y"), "{}", rendered);
}

#[test]
fn test_each_run_gets_fresh_scope() {
    let console = Rc::new(BufferConsole::new());
    run_with_console("declare x = 1", console.clone()).unwrap();
    let err = run_with_console("x", console).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndeclaredVariable("x".into()));
}
