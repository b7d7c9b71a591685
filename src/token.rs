//! Token definitions for Murk
//!
//! Tokens represent the atomic units of meaning in source code.

use std::fmt;
use std::rc::Rc;

/// Suffix that marks an import as a source file rather than a built-in module
pub const FILE_EXTENSION: &str = ".mrk";

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token types in Murk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals and names
    Identifier,
    String,
    Number,
    Boolean,

    // Delimiters
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }
    Dot,        // .
    Equal,      // =
    Comma,      // ,
    Colon,      // :
    Percent,    // %
}

impl TokenKind {
    /// Whether a token of this kind may appear as a call argument or a value
    pub fn is_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::String | TokenKind::Number | TokenKind::Boolean
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, TokenKind::String | TokenKind::Number | TokenKind::Boolean)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "Identifier",
            TokenKind::String => "String",
            TokenKind::Number => "Number",
            TokenKind::Boolean => "Boolean",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Dot => ".",
            TokenKind::Equal => "=",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Percent => "%",
        };
        f.write_str(name)
    }
}

/// Reserved identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Import,
    Export,
    Function,
    Var,
    Return,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Function => "function",
            Keyword::Var => "var",
            Keyword::Return => "return",
        }
    }
}

/// Check if a string is a keyword and return the corresponding keyword
pub fn lookup_keyword(ident: &str) -> Option<Keyword> {
    match ident {
        "import" => Some(Keyword::Import),
        "export" => Some(Keyword::Export),
        "function" => Some(Keyword::Function),
        "var" => Some(Keyword::Var),
        "return" => Some(Keyword::Return),
        _ => None,
    }
}

/// Boolean literal spellings
pub fn lookup_boolean(ident: &str) -> Option<bool> {
    match ident {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A token with its kind, text and location.
///
/// `scope` names the function whose body contains the token; it is `None` at
/// the top level of a file and is filled in by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    pub scope: Option<Rc<str>>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, lexeme, span, scope: None }
    }

    /// The keyword this token spells, if it is an identifier
    pub fn keyword(&self) -> Option<Keyword> {
        if self.kind == TokenKind::Identifier {
            lookup_keyword(&self.lexeme)
        } else {
            None
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier && self.keyword().is_none()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "\"{}\"", self.lexeme),
            _ => f.write_str(&self.lexeme),
        }
    }
}
