//! Runtime value types for Murk

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ErrorKind, MurkError, Result};
use crate::token::{Token, TokenKind};

/// The type tag carried alongside every value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Map,
    Function,
}

impl ValueType {
    /// Look up a type by the name used in parameter annotations
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(ValueType::String),
            "Number" => Some(ValueType::Number),
            "Boolean" => Some(ValueType::Boolean),
            "Array" => Some(ValueType::Array),
            "Map" => Some(ValueType::Map),
            "Function" => Some(ValueType::Function),
            _ => None,
        }
    }

    /// Type of a literal token, `None` for identifiers and punctuation
    pub fn of_literal(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::String => Some(ValueType::String),
            TokenKind::Number => Some(ValueType::Number),
            TokenKind::Boolean => Some(ValueType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "String",
            ValueType::Number => "Number",
            ValueType::Boolean => "Boolean",
            ValueType::Array => "Array",
            ValueType::Map => "Map",
            ValueType::Function => "Function",
        };
        f.write_str(name)
    }
}

/// A reference to something callable: a declared function or a module export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    pub module: Option<String>,
    pub name: String,
}

impl FunctionRef {
    pub fn declared(name: impl Into<String>) -> Self {
        Self { module: None, name: name.into() }
    }

    pub fn exported(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self { module: Some(module.into()), name: name.into() }
    }
}

/// Runtime values in Murk
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Function(FunctionRef),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Function(_) => ValueType::Function,
        }
    }

    /// Build the value a literal token denotes
    pub fn from_literal(token: &Token) -> Result<Value> {
        match token.kind {
            TokenKind::String => Ok(Value::String(token.lexeme.clone())),
            TokenKind::Number => token
                .lexeme
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| MurkError::at(ErrorKind::ExpectedValue(token.lexeme.clone()), token.span)),
            TokenKind::Boolean => Ok(Value::Boolean(token.lexeme == "true")),
            _ => Err(MurkError::at(
                ErrorKind::ExpectedValue(token.lexeme.clone()),
                token.span,
            )),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendering used inside collections, where strings are quoted
    fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map(fields) => {
                if fields.is_empty() {
                    return write!(f, "%()");
                }
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(key, value)| format!("  {}: {}", key, value.repr()))
                    .collect();
                write!(f, "%(\n{}\n)", fields.join(",\n"))
            }
            Value::Function(func) => match &func.module {
                Some(module) => write!(f, "<fn {}.{}>", module, func.name),
                None => write!(f, "<fn {}>", func.name),
            },
        }
    }
}
