//! Tree-walking interpreter for Murk
//!
//! Executes a parsed [`Program`] node by node. Function bodies run in nested
//! interpreters that share the function table, the return log and the console
//! with their caller but own their variables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{AssignTarget, Call, Expr, FunctionDecl, ModuleAccess, Node, NodeKind, Program};
use crate::console::{SharedConsole, StdConsole};
use crate::environment::{Environment, ResultCell, Variable};
use crate::error::{ErrorKind, MurkError, Result};
use crate::module::{CallContext, Export, Imports, NativeFn};
use crate::token::{Span, Token, TokenKind};
use crate::value::{FunctionRef, Value};

/// Maximum call depth
pub const MAX_CALL_DEPTH: usize = 64;

/// Declared functions, shared with nested interpreters
pub type FunctionTable = Rc<RefCell<HashMap<String, Rc<FunctionDecl>>>>;

/// Every value returned so far, shared with nested interpreters
pub type ReturnLog = Rc<RefCell<Vec<FunctionReturn>>>;

/// The outcome of a call or `return` that produced a value
#[derive(Debug, Clone)]
pub struct FunctionReturn {
    /// Name of the call, of the function a `return` ended, or of a variable
    /// rebound to a plain value after holding a call result
    pub name: String,
    pub cell: ResultCell,
    /// Variable the result was captured into
    pub owner: Option<String>,
    /// Variables declared from the owner, directly or transitively
    pub aliases: Vec<String>,
    pub span: Span,
}

impl FunctionReturn {
    fn new(name: impl Into<String>, cell: ResultCell, owner: Option<&str>, span: Span) -> Self {
        Self {
            name: name.into(),
            cell,
            owner: owner.map(str::to_string),
            aliases: Vec::new(),
            span,
        }
    }

    pub fn value(&self) -> Option<Value> {
        self.cell.get()
    }

    /// Whether the record is reachable under `name`
    pub fn answers_to(&self, name: &str) -> bool {
        self.owner.as_deref() == Some(name) || self.aliases.iter().any(|alias| alias == name)
    }
}

/// What a visited node asks of the enclosing body
enum Flow {
    Continue,
    Return(Value),
}

/// An identifier resolved for binding
enum Resolved {
    Value(Value),
    Alias(ResultCell),
}

/// The interpreter
pub struct Interpreter {
    variables: Environment,
    functions: FunctionTable,
    returns: ReturnLog,
    modules: Imports,
    console: SharedConsole,
    depth: usize,
}

impl Interpreter {
    pub fn new(console: SharedConsole) -> Self {
        Self {
            variables: Environment::new(),
            functions: Rc::new(RefCell::new(HashMap::new())),
            returns: Rc::new(RefCell::new(Vec::new())),
            modules: Imports::new(),
            console,
            depth: 0,
        }
    }

    /// Run a program, returning every return record produced so far.
    ///
    /// State persists between calls, so a REPL can feed one program per line.
    pub fn execute(&mut self, program: &Program) -> Result<Vec<FunctionReturn>> {
        self.modules.merge(&program.imports);
        self.visit(&program.nodes)?;
        Ok(self.returns.borrow().clone())
    }

    pub fn variables(&self) -> &Environment {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Environment {
        &mut self.variables
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn returns(&self) -> &ReturnLog {
        &self.returns
    }

    pub fn modules(&self) -> &Imports {
        &self.modules
    }

    pub fn console(&self) -> SharedConsole {
        Rc::clone(&self.console)
    }

    // ==================== Nodes ====================

    fn visit(&mut self, nodes: &[Node]) -> Result<Flow> {
        for node in nodes {
            trace!(line = node.span.line, kind = node.kind.label(), "executing node");
            if let Flow::Return(value) = self.visit_node(node).map_err(|err| err.or_at(node.span))? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn visit_node(&mut self, node: &Node) -> Result<Flow> {
        match &node.kind {
            NodeKind::FunctionDecl(decl) => {
                let mut functions = self.functions.borrow_mut();
                if functions.contains_key(&decl.name) {
                    return Err(MurkError::at(
                        ErrorKind::FunctionAlreadyDeclared(decl.name.clone()),
                        decl.span,
                    ));
                }
                debug!(function = %decl.name, params = decl.arity(), "declared function");
                functions.insert(decl.name.clone(), Rc::clone(decl));
            }

            NodeKind::Call(call) => {
                self.call_declared(call)?;
            }

            NodeKind::ModuleAccess(access) => {
                let value = self.module_access(access)?;
                if let (Some(value), Some(_)) = (value, &access.args) {
                    self.push_record(FunctionReturn::new(
                        access.qualified_name(),
                        ResultCell::ready(value),
                        None,
                        access.span,
                    ));
                }
            }

            NodeKind::VarDecl { name, value } => self.declare(name, value, node.span)?,

            NodeKind::Assign { target, value } => match target {
                AssignTarget::Variable(name) => self.assign(name, value, node.span)?,
                AssignTarget::Field { map, field } => self.assign_field(map, field, value, node.span)?,
            },

            NodeKind::Return(expr) => {
                let value = self.expr_value(expr)?;
                let name = node.scope.as_deref().unwrap_or_default();
                debug!(function = name, value = %value, "returned");
                self.push_record(FunctionReturn::new(
                    name,
                    ResultCell::ready(value.clone()),
                    None,
                    node.span,
                ));
                return Ok(Flow::Return(value));
            }

            NodeKind::Import { module } => {
                self.modules.insert(Rc::clone(module));
            }

            NodeKind::FileImport { file, program } => {
                debug!(path = %file.path.display(), nodes = program.nodes.len(), "running imported file");
                self.modules.merge(&program.imports);
                self.visit(&program.nodes)
                    .map_err(|err| err.in_file(&file.path, &file.source))?;
            }
        }

        Ok(Flow::Continue)
    }

    fn declare(&mut self, name: &str, expr: &Expr, span: Span) -> Result<()> {
        if self.variables.contains(name) {
            return Err(MurkError::at(ErrorKind::AlreadyDeclared(name.to_string()), span));
        }

        if expr.is_call() {
            let cell = ResultCell::pending();
            self.variables.declare(Variable::alias(name, cell.clone()))?;
            if let Err(err) = self.capture_call(name, cell, expr) {
                self.variables.remove(name);
                return Err(err);
            }
            return Ok(());
        }

        let variable = match expr {
            Expr::Reference(token) => self.bind_reference(name, token)?,
            other => Variable::new(name, self.expr_value(other)?),
        };
        debug!(variable = name, "declared variable");
        self.variables.declare(variable)
    }

    fn assign(&mut self, name: &str, expr: &Expr, span: Span) -> Result<()> {
        let Some(previous) = self.variables.get(name).cloned() else {
            return Err(MurkError::at(ErrorKind::UndefinedVariable(name.to_string()), span));
        };

        self.rebind(name, &previous, expr)?;
        match previous.cell() {
            Some(cell) => self.move_records(name, cell, span),
            None => Ok(()),
        }
    }

    fn rebind(&mut self, name: &str, previous: &Variable, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(token) => {
                let value = Value::from_literal(token)?;
                let current = self.variables.read(name)?;
                if current.value_type() != value.value_type() {
                    return Err(MurkError::at(
                        ErrorKind::TypeMismatch {
                            name: name.to_string(),
                            expected: current.value_type(),
                            got: value.value_type(),
                        },
                        token.span,
                    ));
                }
                self.variables.assign(name, value)
            }
            Expr::Reference(token) => {
                let variable = self.bind_reference(name, token)?;
                if let Some(slot) = self.variables.get_mut(name) {
                    *slot = variable;
                }
                Ok(())
            }
            call if call.is_call() => {
                let cell = ResultCell::pending();
                if let Some(variable) = self.variables.get_mut(name) {
                    variable.set_alias(cell.clone());
                }
                let result = self.capture_call(name, cell, call);
                if result.is_err() {
                    if let Some(variable) = self.variables.get_mut(name) {
                        *variable = previous.clone();
                    }
                }
                result
            }
            other => {
                let value = self.expr_value(other)?;
                self.variables.assign(name, value)
            }
        }
    }

    /// Stop records bound to `name` through `previous` from answering to it.
    ///
    /// A name rebound to a plain value gets a fresh record, so callees reading
    /// it through the return log see the new value.
    fn move_records(&mut self, name: &str, previous: &ResultCell, span: Span) -> Result<()> {
        let current = self.variables.get(name).and_then(|v| v.cell().cloned());
        if current.as_ref().is_some_and(|cell| cell.same_as(previous)) {
            return Ok(());
        }

        let mut released = false;
        for record in self.returns.borrow_mut().iter_mut() {
            if !record.cell.same_as(previous) || !record.answers_to(name) {
                continue;
            }
            if record.owner.as_deref() == Some(name) {
                record.owner = None;
            }
            record.aliases.retain(|alias| alias != name);
            released = true;
        }

        if released && current.is_none() {
            let value = self.variables.read(name)?;
            let cell = ResultCell::ready(value);
            if let Some(variable) = self.variables.get_mut(name) {
                variable.set_alias(cell.clone());
            }
            debug!(variable = name, "republished rebound variable");
            self.push_record(FunctionReturn::new(name, cell, Some(name), span));
        }
        Ok(())
    }

    fn assign_field(&mut self, map: &str, field: &str, expr: &Expr, span: Span) -> Result<()> {
        let Value::Map(mut fields) = self.variables.read(map)? else {
            return Err(MurkError::at(ErrorKind::NotAMap(map.to_string()), span));
        };

        let value = self.expr_value(expr)?;
        if let Some(existing) = fields.get(field) {
            if existing.value_type() != value.value_type() {
                return Err(MurkError::at(
                    ErrorKind::TypeMismatch {
                        name: format!("{}.{}", map, field),
                        expected: existing.value_type(),
                        got: value.value_type(),
                    },
                    expr.span(),
                ));
            }
        }

        fields.insert(field.to_string(), value);
        self.variables.assign(map, Value::Map(fields))
    }

    // ==================== Calls ====================

    /// Run the call in `expr` for `owner`, whose variable already aliases `cell`
    fn capture_call(&mut self, owner: &str, cell: ResultCell, expr: &Expr) -> Result<()> {
        let (label, value) = self.run(expr)?;
        let value = value
            .ok_or_else(|| MurkError::at(ErrorKind::NoReturnValue(label.clone()), expr.span()))?;

        cell.fill(value);
        debug!(variable = owner, call = %label, "captured call result");
        self.push_record(FunctionReturn::new(label, cell, Some(owner), expr.span()));
        Ok(())
    }

    /// Evaluate an expression, naming it for diagnostics
    fn run(&mut self, expr: &Expr) -> Result<(String, Option<Value>)> {
        match expr {
            Expr::Literal(token) | Expr::Reference(token) => {
                Ok((token.lexeme.clone(), Some(self.operand_value(token)?)))
            }
            Expr::Call(call) => Ok((call.name.clone(), self.call_declared(call)?)),
            Expr::Module(access) => Ok((access.qualified_name(), self.module_access(access)?)),
        }
    }

    fn expr_value(&mut self, expr: &Expr) -> Result<Value> {
        let (label, value) = self.run(expr)?;
        value.ok_or_else(|| MurkError::at(ErrorKind::NoReturnValue(label), expr.span()))
    }

    fn call_declared(&mut self, call: &Call) -> Result<Option<Value>> {
        let decl = self.functions.borrow().get(&call.name).cloned();
        let Some(decl) = decl else {
            return Err(MurkError::at(ErrorKind::UndefinedFunction(call.name.clone()), call.span));
        };

        if decl.arity() != call.args.len() {
            return Err(MurkError::at(
                ErrorKind::WrongArity {
                    function: call.name.clone(),
                    expected: decl.arity().to_string(),
                    got: call.args.len(),
                },
                call.span,
            ));
        }

        let values = call
            .args
            .iter()
            .map(|token| self.operand_value(token))
            .collect::<Result<Vec<_>>>()?;

        self.call_with_values(&decl, values, call.span)
    }

    /// Run a declared function's body in a nested interpreter
    pub fn call_with_values(
        &mut self,
        decl: &FunctionDecl,
        values: Vec<Value>,
        span: Span,
    ) -> Result<Option<Value>> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(MurkError::at(ErrorKind::StackOverflow, span));
        }
        if values.len() != decl.arity() {
            return Err(MurkError::at(
                ErrorKind::WrongArity {
                    function: decl.name.clone(),
                    expected: decl.arity().to_string(),
                    got: values.len(),
                },
                span,
            ));
        }

        let mut bound = Vec::with_capacity(values.len());
        for (index, (param, value)) in decl.params.iter().zip(values).enumerate() {
            if let Some(expected) = param.ty {
                if value.value_type() != expected {
                    return Err(MurkError::at(
                        ErrorKind::ArgumentType {
                            function: decl.name.clone(),
                            index: index + 1,
                            expected,
                            got: value.value_type(),
                        },
                        span,
                    ));
                }
            }
            bound.push(Variable::new(param.name.clone(), value));
        }

        let mut modules = self.modules.clone();
        modules.merge(&decl.body.imports);

        let mut nested = Interpreter {
            variables: Environment::with_variables(bound),
            functions: Rc::clone(&self.functions),
            returns: Rc::clone(&self.returns),
            modules,
            console: Rc::clone(&self.console),
            depth: self.depth + 1,
        };

        debug!(function = %decl.name, depth = nested.depth, "calling function");
        let flow = nested.visit(&decl.body.nodes).map_err(|err| match &decl.file {
            Some(file) => err.in_file(&file.path, &file.source),
            None => err,
        })?;
        match flow {
            Flow::Return(value) => Ok(Some(value)),
            Flow::Continue => Ok(None),
        }
    }

    /// A module field read, a module call, or a field read on a map variable
    fn module_access(&mut self, access: &ModuleAccess) -> Result<Option<Value>> {
        if let Some(module) = self.modules.get(&access.module).cloned() {
            let missing = || {
                MurkError::at(
                    ErrorKind::MissingExport {
                        module: access.module.clone(),
                        field: access.field.clone(),
                    },
                    access.span,
                )
            };

            return match (module.get(&access.field).ok_or_else(missing)?, &access.args) {
                (Export::Function(native), Some(args)) => {
                    let native = native.clone();
                    self.call_native(&module.name, &native, args, access.span)
                }
                (Export::Function(native), None) => Ok(Some(Value::Function(
                    FunctionRef::exported(module.name.clone(), native.name.clone()),
                ))),
                (Export::Field(_), Some(_)) => Err(MurkError::at(
                    ErrorKind::NotCallable {
                        module: access.module.clone(),
                        field: access.field.clone(),
                    },
                    access.span,
                )),
                (Export::Field(value), None) => Ok(Some(value.clone())),
            };
        }

        if self.variables.contains(&access.module) {
            if access.args.is_some() {
                return Err(MurkError::at(
                    ErrorKind::NotCallable {
                        module: access.module.clone(),
                        field: access.field.clone(),
                    },
                    access.span,
                ));
            }
            let Value::Map(fields) = self.variables.read(&access.module)? else {
                return Err(MurkError::at(ErrorKind::NotAMap(access.module.clone()), access.span));
            };
            return match fields.get(&access.field) {
                Some(value) => Ok(Some(value.clone())),
                None => Err(MurkError::at(
                    ErrorKind::MissingExport {
                        module: access.module.clone(),
                        field: access.field.clone(),
                    },
                    access.span,
                )),
            };
        }

        Err(MurkError::at(ErrorKind::UndefinedModule(access.module.clone()), access.span))
    }

    fn call_native(
        &mut self,
        module: &str,
        native: &NativeFn,
        args: &[Token],
        span: Span,
    ) -> Result<Option<Value>> {
        if !native.arity.accepts(args.len()) {
            return Err(MurkError::at(
                ErrorKind::WrongArity {
                    function: format!("{}.{}", module, native.name),
                    expected: native.arity.to_string(),
                    got: args.len(),
                },
                span,
            ));
        }

        debug!(module, function = %native.name, args = args.len(), "calling native function");
        let mut context = CallContext::new(self, &native.name, args, span);
        (native.func)(&mut context).map_err(|err| err.or_at(span))
    }

    // ==================== Resolution ====================

    /// Value of a call argument: a literal, or an identifier resolved like a
    /// declaration's right-hand side
    pub fn operand_value(&mut self, token: &Token) -> Result<Value> {
        match token.kind {
            TokenKind::String | TokenKind::Number | TokenKind::Boolean => Value::from_literal(token),
            TokenKind::Identifier => self.identifier_value(token),
            _ => Err(MurkError::at(ErrorKind::ExpectedValue(token.lexeme.clone()), token.span)),
        }
    }

    /// The declared function an argument names, for callbacks
    pub fn callback(&mut self, token: &Token) -> Result<Rc<FunctionDecl>> {
        let not_callable = || {
            MurkError::at(
                ErrorKind::Runtime(format!("\"{}\" is not a declared function", token.lexeme)),
                token.span,
            )
        };

        match self.operand_value(token)? {
            Value::Function(FunctionRef { module: None, name }) => self
                .functions
                .borrow()
                .get(&name)
                .cloned()
                .ok_or_else(|| MurkError::at(ErrorKind::UndefinedFunction(name), token.span)),
            _ => Err(not_callable()),
        }
    }

    fn identifier_value(&mut self, token: &Token) -> Result<Value> {
        if self.variables.contains(&token.lexeme) {
            return self.variables.read(&token.lexeme).map_err(|err| err.or_at(token.span));
        }

        match self.resolve(token)? {
            Resolved::Value(value) => Ok(value),
            Resolved::Alias(cell) => cell.get().ok_or_else(|| {
                MurkError::at(ErrorKind::UnresolvedCall(token.lexeme.clone()), token.span)
            }),
        }
    }

    /// Bind `name` to whatever `token` refers to, sharing call results
    fn bind_reference(&mut self, name: &str, token: &Token) -> Result<Variable> {
        match self.resolve(token)? {
            Resolved::Value(value) => Ok(Variable::new(name, value)),
            Resolved::Alias(cell) => {
                self.record_alias(&cell, name);
                Ok(Variable::alias(name, cell))
            }
        }
    }

    /// Resolve an identifier: variables, then return records, then declared
    /// functions, then module exports, then fields of map variables
    fn resolve(&self, token: &Token) -> Result<Resolved> {
        let name = token.lexeme.as_str();

        if let Some(variable) = self.variables.get(name) {
            if let Some(cell) = variable.cell() {
                return Ok(Resolved::Alias(cell.clone()));
            }
            if let Some(value) = variable.peek() {
                return Ok(Resolved::Value(value));
            }
        }

        let record = self
            .returns
            .borrow()
            .iter()
            .rev()
            .find(|record| record.answers_to(name))
            .map(|record| record.cell.clone());
        if let Some(cell) = record {
            return Ok(Resolved::Alias(cell));
        }

        if self.functions.borrow().contains_key(name) {
            return Ok(Resolved::Value(Value::Function(FunctionRef::declared(name))));
        }

        if let Some((module, export)) = self.modules.find_export(name) {
            let value = match export {
                Export::Field(value) => value.clone(),
                Export::Function(_) => Value::Function(FunctionRef::exported(module.name.clone(), name)),
            };
            return Ok(Resolved::Value(value));
        }

        if let Some(value) = self.variables.find_map_field(name) {
            return Ok(Resolved::Value(value));
        }

        Err(MurkError::at(ErrorKind::NotFound(name.to_string()), token.span))
    }

    // ==================== Helpers ====================

    fn push_record(&self, record: FunctionReturn) {
        self.returns.borrow_mut().push(record);
    }

    /// Make the record holding `cell` reachable under `name` as well
    fn record_alias(&self, cell: &ResultCell, name: &str) {
        let mut returns = self.returns.borrow_mut();
        if let Some(record) = returns.iter_mut().rev().find(|record| record.cell.same_as(cell)) {
            if !record.answers_to(name) {
                record.aliases.push(name.to_string());
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(StdConsole::shared())
    }
}
