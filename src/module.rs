//! Importable modules and the contract their functions are called through
//!
//! Built-in modules are looked up through a [`ModuleRegistry`] so the parser
//! does not depend on where a module's symbols come from.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::console::SharedConsole;
use crate::environment::Environment;
use crate::error::{ErrorKind, MurkError, Result};
use crate::interpreter::{FunctionTable, Interpreter, ReturnLog};
use crate::token::{Span, Token};
use crate::value::Value;

/// Native function type
pub type NativeFnPtr = fn(&mut CallContext<'_>) -> Result<Option<Value>>;

/// How many arguments a native function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Native/built-in function
#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    pub arity: Arity,
    pub func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(name: &str, arity: Arity, func: NativeFnPtr) -> Self {
        Self {
            name: name.to_string(),
            arity,
            func,
        }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A symbol exported by a module
#[derive(Debug, Clone)]
pub enum Export {
    Function(NativeFn),
    Field(Value),
}

/// A named table of exported symbols
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    exports: HashMap<String, Export>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: HashMap::new(),
        }
    }

    pub fn function(mut self, name: &str, arity: Arity, func: NativeFnPtr) -> Self {
        self.exports
            .insert(name.to_string(), Export::Function(NativeFn::new(name, arity, func)));
        self
    }

    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.exports.insert(name.to_string(), Export::Field(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.exports.iter().map(|(name, export)| (name.as_str(), export))
    }
}

/// Resolves built-in module names to their symbol tables
pub trait ModuleRegistry {
    fn resolve(&self, name: &str) -> Option<Rc<Module>>;
}

/// Registry of the modules that ship with the interpreter
#[derive(Debug, Clone)]
pub struct Builtins {
    modules: HashMap<String, Rc<Module>>,
}

impl Builtins {
    /// A registry with no modules at all
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    pub fn register(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), Rc::new(module));
    }
}

impl Default for Builtins {
    fn default() -> Self {
        let mut builtins = Self::empty();
        for module in crate::stdlib::modules() {
            builtins.register(module);
        }
        builtins
    }
}

impl ModuleRegistry for Builtins {
    fn resolve(&self, name: &str) -> Option<Rc<Module>> {
        self.modules.get(name).cloned()
    }
}

/// The modules visible to a program, unique by name
#[derive(Debug, Clone, Default)]
pub struct Imports {
    modules: Vec<Rc<Module>>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module unless one with the same name is already present
    pub fn insert(&mut self, module: Rc<Module>) -> bool {
        if self.get(&module.name).is_some() {
            return false;
        }
        self.modules.push(module);
        true
    }

    pub fn merge(&mut self, other: &Imports) {
        for module in &other.modules {
            self.insert(Rc::clone(module));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Module>> {
        self.modules.iter().find(|module| module.name == name)
    }

    /// The first imported module exporting `symbol`
    pub fn find_export(&self, symbol: &str) -> Option<(&Rc<Module>, &Export)> {
        self.modules
            .iter()
            .find_map(|module| module.get(symbol).map(|export| (module, export)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Module>> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Everything a native function can see while it runs
pub struct CallContext<'a> {
    interpreter: &'a mut Interpreter,
    name: &'a str,
    args: &'a [Token],
    span: Span,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        interpreter: &'a mut Interpreter,
        name: &'a str,
        args: &'a [Token],
        span: Span,
    ) -> Self {
        Self {
            interpreter,
            name,
            args,
            span,
        }
    }

    /// Name of the function being called, e.g. `parse`
    pub fn name(&self) -> &str {
        self.name
    }

    /// Argument tokens exactly as written at the call site
    pub fn args(&self) -> &[Token] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Token> {
        self.args.get(index)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn variables(&self) -> &Environment {
        self.interpreter.variables()
    }

    pub fn variables_mut(&mut self) -> &mut Environment {
        self.interpreter.variables_mut()
    }

    pub fn functions(&self) -> &FunctionTable {
        self.interpreter.functions()
    }

    pub fn returns(&self) -> &ReturnLog {
        self.interpreter.returns()
    }

    pub fn modules(&self) -> &Imports {
        self.interpreter.modules()
    }

    pub fn console(&self) -> SharedConsole {
        self.interpreter.console()
    }

    /// Value of argument `index`, resolving identifiers like a declaration would
    pub fn value(&mut self, index: usize) -> Result<Value> {
        let args = self.args;
        let token = args
            .get(index)
            .ok_or_else(|| self.error(format!("{}() is missing argument {}", self.name, index + 1)))?;
        self.interpreter.operand_value(token)
    }

    /// Values of every argument, in order
    pub fn values(&mut self) -> Result<Vec<Value>> {
        (0..self.args.len()).map(|index| self.value(index)).collect()
    }

    /// Look up the declared function argument `index` refers to
    pub fn function(&mut self, index: usize) -> Result<Rc<FunctionDecl>> {
        let args = self.args;
        let token = args
            .get(index)
            .ok_or_else(|| self.error(format!("{}() is missing argument {}", self.name, index + 1)))?;
        self.interpreter.callback(token)
    }

    /// Run a declared function with already evaluated arguments
    pub fn invoke(&mut self, function: &FunctionDecl, values: Vec<Value>) -> Result<Option<Value>> {
        self.interpreter.call_with_values(function, values, self.span)
    }

    /// A runtime error positioned at the call
    pub fn error(&self, message: impl Into<String>) -> MurkError {
        MurkError::at(ErrorKind::Runtime(message.into()), self.span)
    }

    /// A runtime error positioned at argument `index`
    pub fn arg_error(&self, index: usize, message: impl Into<String>) -> MurkError {
        let span = self.args.get(index).map_or(self.span, |token| token.span);
        MurkError::at(ErrorKind::Runtime(message.into()), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_are_deduplicated() {
        let io = Rc::new(Module::new("IO"));
        let mut imports = Imports::new();
        assert!(imports.insert(Rc::clone(&io)));
        assert!(!imports.insert(Rc::new(Module::new("IO"))));

        let mut other = Imports::new();
        other.insert(Rc::new(Module::new("Math")));
        other.insert(io);
        imports.merge(&other);
        let names: Vec<&str> = imports.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["IO", "Math"]);
    }

    #[test]
    fn test_builtins_resolve_standard_modules() {
        let builtins = Builtins::default();
        for name in ["IO", "Number", "Math", "String", "Array"] {
            assert!(builtins.resolve(name).is_some(), "missing {}", name);
        }
        assert!(builtins.resolve("Nope").is_none());
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(4));
        assert!(!Arity::AtLeast(1).accepts(0));
    }
}
