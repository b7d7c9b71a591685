//! Variable storage for Murk
//!
//! Each interpreter instance owns one [`Environment`]. A variable either
//! holds a value or aliases the [`ResultCell`] of a call, which is read
//! lazily and may be shared by any number of variables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorKind, MurkError, Result};
use crate::value::{Value, ValueType};

/// The result slot of a call. Empty until the call returns.
#[derive(Debug, Clone, Default)]
pub struct ResultCell(Rc<RefCell<Option<Value>>>);

impl ResultCell {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn ready(value: Value) -> Self {
        Self(Rc::new(RefCell::new(Some(value))))
    }

    pub fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    pub fn fill(&self, value: Value) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn is_ready(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.0.borrow().as_ref().map(Value::value_type)
    }

    /// Whether both handles point at the same call result
    pub fn same_as(&self, other: &ResultCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Ready(Value),
    Alias(ResultCell),
}

/// A named variable
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    slot: Slot,
    /// The call result the variable is bound to; outlives materialisation
    origin: Option<ResultCell>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), slot: Slot::Ready(value), origin: None }
    }

    /// A variable standing in for the result of a call
    pub fn alias(name: impl Into<String>, cell: ResultCell) -> Self {
        Self {
            name: name.into(),
            slot: Slot::Alias(cell.clone()),
            origin: Some(cell),
        }
    }

    /// Whether the value has not been read out of the call result yet
    pub fn is_call_alias(&self) -> bool {
        matches!(self.slot, Slot::Alias(_))
    }

    /// The call result this variable is bound to, read or not
    pub fn cell(&self) -> Option<&ResultCell> {
        self.origin.as_ref()
    }

    /// Current value without materialising an alias
    pub fn peek(&self) -> Option<Value> {
        match &self.slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Alias(cell) => cell.get(),
        }
    }

    /// Declared type, `None` while the aliased call has not returned
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.slot {
            Slot::Ready(value) => Some(value.value_type()),
            Slot::Alias(cell) => cell.value_type(),
        }
    }

    /// Read the value, replacing a resolved alias with its value
    pub fn read(&mut self) -> Result<Value> {
        let value = match &self.slot {
            Slot::Ready(value) => return Ok(value.clone()),
            Slot::Alias(cell) => cell.get(),
        };
        match value {
            Some(value) => {
                self.slot = Slot::Ready(value.clone());
                Ok(value)
            }
            None => Err(MurkError::new(ErrorKind::UnresolvedCall(self.name.clone()), None)),
        }
    }

    /// Overwrite with a plain value, dropping any call binding
    pub fn set(&mut self, value: Value) {
        self.slot = Slot::Ready(value);
        self.origin = None;
    }

    pub fn set_alias(&mut self, cell: ResultCell) {
        self.slot = Slot::Alias(cell.clone());
        self.origin = Some(cell);
    }
}

/// The variable table of one interpreter scope
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Variable>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope seeded with bound parameters
    pub fn with_variables(variables: impl IntoIterator<Item = Variable>) -> Self {
        let mut env = Self::new();
        for variable in variables {
            env.values.insert(variable.name.clone(), variable);
        }
        env
    }

    /// Add a variable; names are unique within a scope
    pub fn declare(&mut self, variable: Variable) -> Result<()> {
        if self.values.contains_key(&variable.name) {
            return Err(MurkError::new(
                ErrorKind::AlreadyDeclared(variable.name),
                None,
            ));
        }
        self.values.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.values.get_mut(name)
    }

    /// Read a variable's value, materialising it if it aliases a call
    pub fn read(&mut self, name: &str) -> Result<Value> {
        match self.values.get_mut(name) {
            Some(variable) => variable.read(),
            None => Err(MurkError::new(
                ErrorKind::UndefinedVariable(name.to_string()),
                None,
            )),
        }
    }

    /// Overwrite an existing variable's value
    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        match self.values.get_mut(name) {
            Some(variable) => {
                variable.set(value);
                Ok(())
            }
            None => Err(MurkError::new(
                ErrorKind::UndefinedVariable(name.to_string()),
                None,
            )),
        }
    }

    /// Find a map-valued variable that has a field called `field`
    pub fn find_map_field(&self, field: &str) -> Option<Value> {
        self.values.values().find_map(|variable| match variable.peek() {
            Some(Value::Map(fields)) => fields.get(field).cloned(),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_read() {
        let mut env = Environment::new();
        env.declare(Variable::new("x", Value::String("5".into()))).unwrap();
        assert_eq!(env.read("x").unwrap(), Value::String("5".into()));
        assert_eq!(env.get("x").unwrap().value_type(), Some(ValueType::String));
    }

    #[test]
    fn test_redeclaration_fails() {
        let mut env = Environment::new();
        env.declare(Variable::new("x", Value::Number(1.0))).unwrap();
        let err = env.declare(Variable::new("x", Value::Boolean(true))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyDeclared("x".into()));
    }

    #[test]
    fn test_alias_resolves_lazily() {
        let cell = ResultCell::pending();
        let mut env = Environment::new();
        env.declare(Variable::alias("a", cell.clone())).unwrap();
        env.declare(Variable::alias("b", cell.clone())).unwrap();

        let err = env.read("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedCall("a".into()));

        cell.fill(Value::Number(5.0));
        assert_eq!(env.read("b").unwrap(), Value::Number(5.0));
        assert!(!env.get("b").unwrap().is_call_alias());
        assert!(env.get("b").unwrap().cell().unwrap().same_as(&cell));
        assert!(env.get("a").unwrap().is_call_alias());
        assert_eq!(env.get("a").unwrap().value_type(), Some(ValueType::Number));
    }

    #[test]
    fn test_plain_assignment_drops_call_binding() {
        let cell = ResultCell::ready(Value::Number(1.0));
        let mut env = Environment::with_variables([Variable::alias("a", cell)]);
        env.read("a").unwrap();
        env.assign("a", Value::Number(2.0)).unwrap();
        assert!(env.get("a").unwrap().cell().is_none());
        assert!(env.remove("a").is_some());
        assert!(!env.contains("a"));
    }

    #[test]
    fn test_find_map_field() {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("PI".to_string(), Value::Number(3.0));
        let env = Environment::with_variables([Variable::new("consts", Value::Map(fields))]);
        assert_eq!(env.find_map_field("PI"), Some(Value::Number(3.0)));
        assert_eq!(env.find_map_field("TAU"), None);
    }
}
