//! `Number`: conversions into numbers

use super::string_arg;
use crate::error::Result;
use crate::module::{Arity, CallContext, Module};
use crate::value::Value;

const NAME: &str = "Number";

pub fn module() -> Module {
    Module::new(NAME).function("parse", Arity::Exact(1), parse)
}

fn parse(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let text = string_arg(ctx, NAME, 0)?;
    match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(Value::Number(number))),
        _ => Err(ctx.arg_error(0, format!("\"{}\" can't be parsed to a Number", text))),
    }
}
