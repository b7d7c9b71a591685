use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use murk::error::ErrorKind;
use murk::value::ValueType;
use murk::{run_with_console, BufferConsole, MurkError};

fn run_with_input(source: &str, input: &[&str]) -> (BufferConsole, Result<(), MurkError>) {
    let console = Rc::new(RefCell::new(BufferConsole::with_input(input.iter().copied())));
    let result = run_with_console(source, Path::new("."), console.clone()).map(|_| ());
    let console = console.replace(BufferConsole::new());
    (console, result)
}

fn output_of(source: &str) -> Vec<String> {
    let (console, result) = run_with_input(source, &[]);
    result.expect("Execution failed");
    console.output
}

fn error_of(source: &str) -> MurkError {
    let (_, result) = run_with_input(source, &[]);
    result.expect_err("expected an error")
}

#[test]
fn test_printf_fills_placeholders() {
    let source = r#"
        import "IO"
        import "Math"
        var a = 2
        var b = 3
        var total = Math.sum(a, b)
        IO.printf("{} + {} = {}", a, b, total)
    "#;
    assert_eq!(output_of(source), vec!["2 + 3 = 5"]);
}

#[test]
fn test_printf_format_from_call_result() {
    let source = r#"
        import "IO"
        function pattern() { return "<{}>" }
        var f = pattern()
        IO.printf(f, 7)
        IO.printf(f, f)
    "#;
    assert_eq!(output_of(source), vec!["<7>", "<<{}>>"]);
}

#[test]
fn test_printf_rejects_non_string_format() {
    let err = error_of("import \"IO\"\nIO.printf(5, 1)");
    assert_eq!(
        err.kind,
        ErrorKind::ArgumentType {
            function: "IO.printf".into(),
            index: 1,
            expected: ValueType::String,
            got: ValueType::Number,
        }
    );
    assert_eq!(err.span.map(|s| (s.line, s.column)), Some((2, 11)));
}

#[test]
fn test_scan_assigns_string_variable() {
    let source = r#"
        import "IO"
        var name = ""
        IO.scan("name? ", name)
        IO.printf("hello {}", name)
    "#;
    let (console, result) = run_with_input(source, &["Ada"]);
    result.expect("Execution failed");
    assert_eq!(console.prompts, vec!["name? "]);
    assert_eq!(console.output, vec!["hello Ada"]);
}

#[test]
fn test_scan_rejects_non_string_target() {
    let source = r#"
        import "IO"
        var age = 1
        IO.scan("age? ", age)
    "#;
    assert_eq!(
        error_of(source).kind,
        ErrorKind::TypeMismatch {
            name: "age".into(),
            expected: ValueType::Number,
            got: ValueType::String,
        }
    );
}

#[test]
fn test_number_parse() {
    let source = r#"
        import "IO"
        import "Number"
        var n = Number.parse(" 42 ")
        IO.print(n)
    "#;
    assert_eq!(output_of(source), vec!["42"]);

    let err = error_of("import \"Number\"\nvar n = Number.parse(\"abc\")");
    assert_eq!(err.kind, ErrorKind::Runtime("\"abc\" can't be parsed to a Number".into()));
}

#[test]
fn test_native_arity() {
    let err = error_of("import \"Number\"\nNumber.parse()");
    assert_eq!(
        err.kind,
        ErrorKind::WrongArity {
            function: "Number.parse".into(),
            expected: "exactly 1".into(),
            got: 0,
        }
    );
}

#[test]
fn test_math() {
    let source = r#"
        import "IO"
        import "Math"
        var s = Math.sum(1, 2, 3)
        var d = Math.subtract(10, 3, 2)
        IO.print(s, d)
    "#;
    assert_eq!(output_of(source), vec!["6 5"]);

    let err = error_of("import \"Math\"\nvar s = Math.sum(\"a\", 1)");
    assert_eq!(
        err.kind,
        ErrorKind::ArgumentType {
            function: "Math.sum".into(),
            index: 1,
            expected: ValueType::Number,
            got: ValueType::String,
        }
    );
}

#[test]
fn test_math_constants_map() {
    let source = r#"
        import "IO"
        import "Math"
        var c = Math.constants
        IO.print(c)
    "#;
    assert_eq!(
        output_of(source),
        vec!["%(\n  E: 2.718281828459045,\n  PI: 3.141592653589793,\n  TAU: 6.283185307179586\n)"]
    );
}

#[test]
fn test_strings() {
    let source = r#"
        import "IO"
        import "String"
        var replaced = String.replace("a-b-c", "-", "+")
        var trimmed = String.trim("  padded  ")
        var lower = String.toLowerCase("LOUD")
        var letters = String.chars("ab")
        IO.print(replaced, trimmed, lower, letters)
    "#;
    assert_eq!(output_of(source), vec!["a+b-c padded loud [\"a\", \"b\"]"]);
}

#[test]
fn test_array_create() {
    let source = r#"
        import "IO"
        import "Array"
        var numbers = Array.create(1, 2, 3)
        IO.print(numbers)
    "#;
    assert_eq!(output_of(source), vec!["[1, 2, 3]"]);

    let err = error_of("import \"Array\"\nvar mixed = Array.create(1, \"a\")");
    assert_eq!(err.kind, ErrorKind::Runtime("all values must be of the same type".into()));
    assert_eq!(err.span.map(|s| s.column), Some(29));
}

#[test]
fn test_array_map() {
    let source = r#"
        import "IO"
        import "Math"
        import "Array"
        function double(value, index) {
            var twice = Math.sum(value, value)
            return twice
        }
        function position(value, index) { return index }
        var numbers = Array.create(1, 2, 3)
        var doubled = Array.map(numbers, double)
        var indexes = Array.map(numbers, position)
        IO.print(doubled, indexes)
    "#;
    assert_eq!(output_of(source), vec!["[2, 4, 6] [0, 1, 2]"]);
}

#[test]
fn test_array_map_callback_shape() {
    let source = r#"
        import "Array"
        function one(value) { return value }
        var numbers = Array.create(1, 2)
        var out = Array.map(numbers, one)
    "#;
    assert_eq!(
        error_of(source).kind,
        ErrorKind::Runtime("map() callback expected 2 arguments, got 1".into())
    );
}
