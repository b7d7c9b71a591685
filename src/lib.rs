//! Murk - a small scripting language
//!
//! Variables can stand in for the result of a call and are resolved lazily;
//! scripts share functions through file-level `export`/`import`.

pub mod ast;
pub mod console;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod stdlib;
pub mod token;
pub mod value;

use std::fs;
use std::path::Path;
use std::rc::Rc;

pub use ast::Program;
pub use console::{BufferConsole, Console, SharedConsole, StdConsole};
pub use error::{ErrorKind, MurkError, Result};
pub use interpreter::{FunctionReturn, Interpreter};
pub use lexer::Lexer;
pub use module::{Builtins, ModuleRegistry};
pub use parser::Parser;
pub use value::Value;

/// Lex and parse `source`, resolving file imports relative to `base_path`
pub fn parse(source: &str, base_path: &Path) -> Result<Program> {
    let tokens = lexer::lex(source)?;
    Parser::new(tokens, Rc::new(Builtins::default()))
        .with_base_path(base_path)
        .parse()
}

/// Convenience function to run Murk code against the terminal
pub fn run(source: &str) -> Result<Vec<FunctionReturn>> {
    run_with_console(source, Path::new("."), StdConsole::shared())
}

/// Run Murk code with the given console
pub fn run_with_console(
    source: &str,
    base_path: &Path,
    console: SharedConsole,
) -> Result<Vec<FunctionReturn>> {
    let program = parse(source, base_path)?;
    Interpreter::new(console).execute(&program)
}

/// Run a script file. Imports resolve next to the file unless `base_dir`
/// is given; errors carry the offending source line.
pub fn run_file(
    path: &Path,
    base_dir: Option<&Path>,
    console: SharedConsole,
) -> Result<Vec<FunctionReturn>> {
    let source = fs::read_to_string(path).map_err(|err| {
        MurkError::new(
            ErrorKind::Io(format!("cannot read file '{}': {}", path.display(), err)),
            None,
        )
    })?;

    let tokens = lexer::lex(&source).map_err(|err| err.with_source(&source))?;
    let mut parser = Parser::new(tokens, Rc::new(Builtins::default())).with_source_path(path);
    if let Some(dir) = base_dir {
        parser = parser.with_base_path(dir);
    }
    let program = parser.parse().map_err(|err| err.with_source(&source))?;

    Interpreter::new(console)
        .execute(&program)
        .map_err(|err| err.with_source(&source))
}

/// Version of the Murk language
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
