//! The standard library: modules a program can `import` by name

mod array;
mod io;
mod math;
mod number;
mod string;

use crate::error::{ErrorKind, MurkError, Result};
use crate::module::{CallContext, Module};
use crate::value::{Value, ValueType};

/// Every built-in module
pub fn modules() -> Vec<Module> {
    vec![
        io::module(),
        number::module(),
        math::module(),
        string::module(),
        array::module(),
    ]
}

/// Argument `index`, which must have type `expected`
fn typed_arg(ctx: &mut CallContext<'_>, module: &str, index: usize, expected: ValueType) -> Result<Value> {
    let value = ctx.value(index)?;
    check_type(ctx, module, index, &value, expected)?;
    Ok(value)
}

/// Check an already evaluated argument against `expected`
fn check_type(
    ctx: &CallContext<'_>,
    module: &str,
    index: usize,
    value: &Value,
    expected: ValueType,
) -> Result<()> {
    if value.value_type() != expected {
        let span = ctx.arg(index).map_or(ctx.span(), |token| token.span);
        return Err(MurkError::at(
            ErrorKind::ArgumentType {
                function: format!("{}.{}", module, ctx.name()),
                index: index + 1,
                expected,
                got: value.value_type(),
            },
            span,
        ));
    }
    Ok(())
}

fn string_arg(ctx: &mut CallContext<'_>, module: &str, index: usize) -> Result<String> {
    match typed_arg(ctx, module, index, ValueType::String)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn number_arg(ctx: &mut CallContext<'_>, module: &str, index: usize) -> Result<f64> {
    let value = typed_arg(ctx, module, index, ValueType::Number)?;
    value
        .as_number()
        .ok_or_else(|| ctx.arg_error(index, format!("{}() takes only numbers", ctx.name())))
}
