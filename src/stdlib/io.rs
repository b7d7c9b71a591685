//! `IO`: console output and input

use tracing::debug;

use super::{check_type, string_arg};
use crate::error::{ErrorKind, MurkError, Result};
use crate::module::{Arity, CallContext, Module};
use crate::token::TokenKind;
use crate::value::{Value, ValueType};

const NAME: &str = "IO";

pub fn module() -> Module {
    Module::new(NAME)
        .function("print", Arity::AtLeast(0), print)
        .function("printf", Arity::AtLeast(2), printf)
        .function("scan", Arity::Exact(2), scan)
}

/// Print every argument, separated by spaces
fn print(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let line = ctx
        .values()?
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    ctx.console().borrow_mut().write_line(&line)?;
    Ok(None)
}

/// Print a format string with each `{}` replaced by the next argument
fn printf(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let values = ctx.values()?;
    check_type(ctx, NAME, 0, &values[0], ValueType::String)?;
    let Value::String(format) = &values[0] else {
        return Ok(None);
    };
    let line = fill_placeholders(format, &values[1..]);
    ctx.console().borrow_mut().write_line(&line)?;
    Ok(None)
}

/// Show a prompt and store the line read into an existing String variable
fn scan(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let prompt = string_arg(ctx, NAME, 0)?;

    let target = match ctx.arg(1) {
        Some(token) if token.kind == TokenKind::Identifier => token.clone(),
        _ => return Err(ctx.arg_error(1, "second argument of scan() must be a variable")),
    };

    let current = match ctx.variables_mut().get_mut(&target.lexeme) {
        Some(variable) => variable.read()?,
        None => {
            return Err(MurkError::at(
                ErrorKind::UndefinedVariable(target.lexeme.clone()),
                target.span,
            ));
        }
    };
    if current.value_type() != ValueType::String {
        return Err(MurkError::at(
            ErrorKind::TypeMismatch {
                name: target.lexeme.clone(),
                expected: current.value_type(),
                got: ValueType::String,
            },
            target.span,
        ));
    }

    let answer = ctx.console().borrow_mut().read_line(&prompt)?;
    debug!(variable = %target.lexeme, "read console input");
    ctx.variables_mut().assign(&target.lexeme, Value::String(answer))?;
    Ok(None)
}

fn fill_placeholders(format: &str, values: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    let mut values = values.iter();

    while let Some(at) = rest.find("{}") {
        let Some(value) = values.next() else {
            break;
        };
        out.push_str(&rest[..at]);
        out.push_str(&value.to_string());
        rest = &rest[at + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_placeholders() {
        let values = [Value::String("a".into()), Value::Number(2.0)];
        assert_eq!(fill_placeholders("{} and {}", &values), "a and 2");
        assert_eq!(fill_placeholders("{}-{}-{}", &values), "a-2-{}");
        assert_eq!(fill_placeholders("no holes", &values), "no holes");
    }
}
