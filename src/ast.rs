//! Syntax node definitions for Murk
//!
//! A program is a list of nodes executed in order. Function bodies and
//! imported files carry their own nested [`Program`].

use std::path::PathBuf;
use std::rc::Rc;

use crate::module::{Imports, Module};
use crate::token::{Span, Token};
use crate::value::ValueType;

/// A parsed program: its nodes and the built-in modules it imports
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
    pub imports: Imports,
}

impl Program {
    pub fn new(nodes: Vec<Node>, imports: Imports) -> Self {
        Self { nodes, imports }
    }
}

/// An imported file, kept so runtime errors can quote it
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: Rc<str>,
}

/// A statement with its location, scope and export flag
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Name of the function whose body contains this node
    pub scope: Option<Rc<str>>,
    /// Set by `export`; only exported nodes survive a file import
    pub exported: bool,
}

impl Node {
    pub fn new(kind: NodeKind, token: &Token) -> Self {
        Self {
            kind,
            span: token.span,
            scope: token.scope.clone(),
            exported: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// `function name(params) { ... }`
    FunctionDecl(Rc<FunctionDecl>),

    /// `name(args)`
    Call(Call),

    /// `Module.field` or `Module.field(args)`
    ModuleAccess(ModuleAccess),

    /// `var name = value`
    VarDecl { name: String, value: Expr },

    /// `name = value` or `map.field = value`
    Assign { target: AssignTarget, value: Expr },

    /// `return value`
    Return(Expr),

    /// `import "Module"`
    Import { module: Rc<Module> },

    /// `import "./file.mrk"`, holding the exported nodes of that file
    FileImport { file: Rc<SourceFile>, program: Program },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::FunctionDecl(_) => "function",
            NodeKind::Call(_) => "call",
            NodeKind::ModuleAccess(_) => "module access",
            NodeKind::VarDecl { .. } => "var",
            NodeKind::Assign { .. } => "assign",
            NodeKind::Return(_) => "return",
            NodeKind::Import { .. } => "import",
            NodeKind::FileImport { .. } => "file import",
        }
    }
}

/// Right-hand side of declarations, assignments and returns
#[derive(Debug, Clone)]
pub enum Expr {
    /// String, number or boolean literal
    Literal(Token),

    /// A bare identifier, resolved when executed
    Reference(Token),

    /// A call to a declared function
    Call(Call),

    /// A module field read or module-qualified call
    Module(ModuleAccess),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(token) | Expr::Reference(token) => token.span,
            Expr::Call(call) => call.span,
            Expr::Module(access) => access.span,
        }
    }

    /// Whether the value comes from a call whose result is aliased
    pub fn is_call(&self) -> bool {
        match self {
            Expr::Call(_) => true,
            Expr::Module(access) => access.args.is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub name: String,
    pub args: Vec<Token>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ModuleAccess {
    pub module: String,
    pub field: String,
    /// `Some` when the field is invoked as a function
    pub args: Option<Vec<Token>>,
    pub span: Span,
}

impl ModuleAccess {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.field)
    }
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Variable(String),
    Field { map: String, field: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<ValueType>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Program,
    pub span: Span,
    /// Set when the function was declared in an imported file
    pub file: Option<Rc<SourceFile>>,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
