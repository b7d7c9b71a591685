//! Error types for Murk
//!
//! Provides structured error handling with source locations.

use crate::token::Span;
use crate::value::ValueType;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error kinds in Murk
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexer errors
    UnexpectedCharacter(char),
    UnterminatedString,
    InvalidIdentifier(String),

    // Parser errors
    UnexpectedToken(String),
    ExpectedToken(String, String),
    ExpectedString(String),
    ExpectedValue(String),
    InvalidArgument(String),
    InvalidParameter(String),
    UnterminatedArguments,
    UnknownType(String),
    ReservedWord(String),
    NestedFunction(String),
    ReturnOutsideFunction,
    InvalidExport(String),

    // Module errors
    ModuleNotFound(String),
    AmbiguousImport(String),
    CircularImport(String),
    NoExports(String),
    Io(String),

    // Runtime errors
    NotFound(String),
    UndefinedVariable(String),
    UndefinedFunction(String),
    UndefinedModule(String),
    AlreadyDeclared(String),
    FunctionAlreadyDeclared(String),
    TypeMismatch {
        name: String,
        expected: ValueType,
        got: ValueType,
    },
    ArgumentType {
        function: String,
        index: usize,
        expected: ValueType,
        got: ValueType,
    },
    WrongArity {
        function: String,
        expected: String,
        got: usize,
    },
    MissingExport {
        module: String,
        field: String,
    },
    NotCallable {
        module: String,
        field: String,
    },
    NotAMap(String),
    UnresolvedCall(String),
    NoReturnValue(String),
    StackOverflow,

    // Raised by standard-library functions
    Runtime(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected token \"{}\"", c),
            ErrorKind::UnterminatedString => write!(f, "unterminated string"),
            ErrorKind::InvalidIdentifier(s) => write!(f, "invalid identifier \"{}\"", s),
            ErrorKind::UnexpectedToken(t) => write!(f, "unexpected token \"{}\"", t),
            ErrorKind::ExpectedToken(expected, got) => {
                write!(f, "expected {}, got \"{}\" instead", expected, got)
            }
            ErrorKind::ExpectedString(got) => {
                write!(f, "expected string after \"import\" keyword, got \"{}\" instead", got)
            }
            ErrorKind::ExpectedValue(got) => {
                write!(f, "expected a valid value after \"=\", got \"{}\" instead", got)
            }
            ErrorKind::InvalidArgument(got) => {
                write!(f, "expected a valid argument, got \"{}\" instead", got)
            }
            ErrorKind::InvalidParameter(got) => {
                write!(f, "expected a parameter name, got \"{}\" instead", got)
            }
            ErrorKind::UnterminatedArguments => write!(f, "argument list is missing a closing \")\""),
            ErrorKind::UnknownType(name) => write!(f, "unknown type \"{}\"", name),
            ErrorKind::ReservedWord(word) => write!(f, "\"{}\" is a reserved word", word),
            ErrorKind::NestedFunction(name) => {
                write!(f, "cannot declare a function inside function \"{}\"", name)
            }
            ErrorKind::ReturnOutsideFunction => write!(f, "cannot return outside a function"),
            ErrorKind::InvalidExport(got) => {
                write!(f, "only imports and functions can be exported, got \"{}\"", got)
            }
            ErrorKind::ModuleNotFound(name) => write!(f, "could not find module \"{}\"", name),
            ErrorKind::AmbiguousImport(name) => {
                write!(f, "\"{}\" names both a built-in module and a file", name)
            }
            ErrorKind::CircularImport(path) => write!(f, "circular import of \"{}\"", path),
            ErrorKind::NoExports(path) => write!(f, "\"{}\" has no exported fields", path),
            ErrorKind::Io(msg) => write!(f, "{}", msg),
            ErrorKind::NotFound(name) => write!(f, "\"{}\" not found", name),
            ErrorKind::UndefinedVariable(name) => write!(f, "variable \"{}\" not found", name),
            ErrorKind::UndefinedFunction(name) => write!(f, "function \"{}\" not found", name),
            ErrorKind::UndefinedModule(name) => write!(f, "module/variable \"{}\" not found", name),
            ErrorKind::AlreadyDeclared(name) => write!(f, "variable \"{}\" already exists", name),
            ErrorKind::FunctionAlreadyDeclared(name) => {
                write!(f, "function \"{}\" already exists", name)
            }
            ErrorKind::TypeMismatch { name, expected, got } => write!(
                f,
                "variable \"{}\" is of type {} and cannot be assigned a value of type {}",
                name, expected, got
            ),
            ErrorKind::ArgumentType { function, index, expected, got } => write!(
                f,
                "\"{}\" expects {} as argument {}, but got {} instead",
                function, expected, index, got
            ),
            ErrorKind::WrongArity { function, expected, got } => write!(
                f,
                "\"{}\" expects {} arguments, but got {} instead",
                function, expected, got
            ),
            ErrorKind::MissingExport { module, field } => {
                write!(f, "\"{}\" not found in module \"{}\"", field, module)
            }
            ErrorKind::NotCallable { module, field } => write!(
                f,
                "\"{}\" in module \"{}\" is not a function, remove the \"()\"",
                field, module
            ),
            ErrorKind::NotAMap(name) => write!(f, "\"{}\" is not a map", name),
            ErrorKind::UnresolvedCall(name) => {
                write!(f, "\"{}\" is read before its call has returned", name)
            }
            ErrorKind::NoReturnValue(name) => write!(f, "\"{}\" did not return a value", name),
            ErrorKind::StackOverflow => write!(f, "stack overflow"),
            ErrorKind::Runtime(msg) => write!(f, "{}", msg),
        }
    }
}

/// A Murk error with location information
#[derive(Debug, Clone)]
pub struct MurkError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub file: Option<PathBuf>,
    pub source_line: Option<String>,
}

impl MurkError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            file: None,
            source_line: None,
        }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    /// Point the error at `span` unless it already has a location
    pub fn or_at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Attach the source line the error points at.
    ///
    /// Errors raised inside an imported file keep their own source, so this is
    /// a no-op once a file has been recorded.
    pub fn with_source(mut self, source: &str) -> Self {
        if self.file.is_some() || self.source_line.is_some() {
            return self;
        }
        if let Some(span) = &self.span {
            let lines: Vec<&str> = source.lines().collect();
            if span.line > 0 && span.line <= lines.len() {
                self.source_line = Some(lines[span.line - 1].to_string());
            }
        }
        self
    }

    /// Record the file the error was raised in, keeping the innermost one
    pub fn in_file(mut self, path: &Path, source: &str) -> Self {
        if self.file.is_none() {
            self = self.with_source(source);
            self.file = Some(path.to_path_buf());
        }
        self
    }
}

impl fmt::Display for MurkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] Error: {}", span.line, span.column, self.kind)?;
        } else {
            write!(f, "Error: {}", self.kind)?;
        }

        if let Some(file) = &self.file {
            write!(f, " (in {})", file.display())?;
        }

        if let (Some(span), Some(line)) = (&self.span, &self.source_line) {
            write!(f, "\n  | {}", line)?;
            write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
        }
        Ok(())
    }
}

impl std::error::Error for MurkError {}

impl From<std::io::Error> for MurkError {
    fn from(err: std::io::Error) -> Self {
        MurkError::new(ErrorKind::Io(err.to_string()), None)
    }
}

/// Result type for Murk operations
pub type Result<T> = std::result::Result<T, MurkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_caret() {
        let err = MurkError::at(ErrorKind::ReturnOutsideFunction, Span::new(0, 6, 2, 3))
            .with_source("var x = 1\n  return x");
        assert_eq!(
            err.to_string(),
            "[line 2:3] Error: cannot return outside a function\n  |   return x\n  |   ^"
        );
    }

    #[test]
    fn test_innermost_file_wins() {
        let err = MurkError::at(ErrorKind::NotFound("y".into()), Span::new(0, 1, 1, 1))
            .in_file(Path::new("lib.mrk"), "y")
            .in_file(Path::new("main.mrk"), "import \"lib.mrk\"");
        assert_eq!(err.file.as_deref(), Some(Path::new("lib.mrk")));
        assert_eq!(err.source_line.as_deref(), Some("y"));
    }
}
