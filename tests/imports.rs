use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use murk::error::ErrorKind;
use murk::{run_file, BufferConsole, MurkError};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn run_main(dir: &Path) -> (Vec<String>, Result<(), MurkError>) {
    let console = Rc::new(RefCell::new(BufferConsole::new()));
    let result = run_file(&dir.join("main.mrk"), None, console.clone()).map(|_| ());
    let output = console.borrow().output.clone();
    (output, result)
}

#[test]
fn test_exported_functions_are_imported() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "greeting.mrk",
        r#"
        export function greet(who) { return who }
        function hidden() { return 1 }
        "#,
    );
    write(
        dir.path(),
        "main.mrk",
        r#"
        import "IO"
        import "greeting.mrk"
        var message = greet("hi")
        IO.print(message)
        "#,
    );

    let (output, result) = run_main(dir.path());
    result.expect("Execution failed");
    assert_eq!(output, vec!["hi"]);
}

#[test]
fn test_unexported_functions_stay_private() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "lib.mrk",
        "export function shown() { return 1 }\nfunction hidden() { return 2 }",
    );
    write(dir.path(), "main.mrk", "import \"lib.mrk\"\nhidden()");

    let (_, result) = run_main(dir.path());
    assert_eq!(result.unwrap_err().kind, ErrorKind::UndefinedFunction("hidden".into()));
}

#[test]
fn test_file_without_exports() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "empty.mrk", "function f() { return 1 }");
    write(dir.path(), "main.mrk", "import \"empty.mrk\"");

    let (_, result) = run_main(dir.path());
    assert_eq!(result.unwrap_err().kind, ErrorKind::NoExports("empty.mrk".into()));
}

#[test]
fn test_circular_imports_fail() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "main.mrk",
        "import \"other.mrk\"\nexport function a() { return 1 }",
    );
    write(
        dir.path(),
        "other.mrk",
        "import \"main.mrk\"\nexport function b() { return 2 }",
    );

    let (_, result) = run_main(dir.path());
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CircularImport("main.mrk".into()));
    assert_eq!(err.file, Some(dir.path().join("other.mrk")));
}

#[test]
fn test_nested_imports_resolve_per_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "lib/util.mrk", "export function id(x) { return x }");
    write(
        dir.path(),
        "lib/mod.mrk",
        "export import \"util.mrk\"\nexport function twice(x) { return x }",
    );
    write(
        dir.path(),
        "main.mrk",
        r#"
        import "IO"
        import "lib/mod.mrk"
        var a = id("util")
        var b = twice("mod")
        IO.print(a, b)
        "#,
    );

    let (output, result) = run_main(dir.path());
    result.expect("Execution failed");
    assert_eq!(output, vec!["util mod"]);
}

#[test]
fn test_errors_in_imported_files_name_the_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.mrk", "export function f( { return 1 }");
    write(dir.path(), "main.mrk", "import \"broken.mrk\"");

    let (_, result) = run_main(dir.path());
    let err = result.unwrap_err();
    assert_eq!(err.file, Some(dir.path().join("broken.mrk")));
    let message = err.to_string();
    assert!(message.contains("broken.mrk"), "unexpected message: {}", message);
    assert!(message.contains("export function f( { return 1 }"));
}

#[test]
fn test_re_exported_builtins_are_visible() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "prelude.mrk",
        "export import \"IO\"\nexport function noop() { return true }",
    );
    write(dir.path(), "main.mrk", "import \"prelude.mrk\"\nIO.print(\"ok\")");

    let (output, result) = run_main(dir.path());
    result.expect("Execution failed");
    assert_eq!(output, vec!["ok"]);
}

#[test]
fn test_runtime_errors_in_imported_functions_name_the_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "lib.mrk",
        "export function f() {\n  var x = 1\n  return missing\n}",
    );
    write(dir.path(), "main.mrk", "import \"lib.mrk\"\nvar ccc = f()");

    let (_, result) = run_main(dir.path());
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound("missing".into()));
    assert_eq!(err.file, Some(dir.path().join("lib.mrk")));
    assert_eq!(err.span.map(|s| s.line), Some(3));
    assert_eq!(err.source_line.as_deref(), Some("  return missing"));
}
