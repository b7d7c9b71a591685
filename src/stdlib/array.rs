//! `Array`: building and transforming arrays

use tracing::debug;

use super::typed_arg;
use crate::error::{ErrorKind, MurkError, Result};
use crate::module::{Arity, CallContext, Module};
use crate::value::{Value, ValueType};

const NAME: &str = "Array";

pub fn module() -> Module {
    Module::new(NAME)
        .function("create", Arity::AtLeast(1), create)
        .function("map", Arity::Exact(2), map)
}

/// An array of the arguments, which must all share one type
fn create(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let values = ctx.values()?;

    if let Some(first) = values.first() {
        let expected = first.value_type();
        if let Some(index) = values.iter().position(|v| v.value_type() != expected) {
            return Err(ctx.arg_error(index, "all values must be of the same type"));
        }
    }

    Ok(Some(Value::Array(values)))
}

/// Call `callback(value, index)` for each element, collecting the results
fn map(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let Value::Array(items) = typed_arg(ctx, NAME, 0, ValueType::Array)? else {
        return Err(ctx.arg_error(0, "map() expected an Array as first argument"));
    };

    let callback = ctx.function(1)?;
    if callback.arity() != 2 {
        return Err(ctx.arg_error(
            1,
            format!("map() callback expected 2 arguments, got {}", callback.arity()),
        ));
    }

    debug!(callback = %callback.name, len = items.len(), "mapping array");
    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let value = ctx
            .invoke(&callback, vec![item, Value::Number(index as f64)])?
            .ok_or_else(|| MurkError::at(ErrorKind::NoReturnValue(callback.name.clone()), ctx.span()))?;
        mapped.push(value);
    }

    Ok(Some(Value::Array(mapped)))
}
