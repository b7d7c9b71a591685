//! `Math`: arithmetic over numbers and common constants

use std::collections::BTreeMap;
use std::f64::consts;

use super::number_arg;
use crate::error::Result;
use crate::module::{Arity, CallContext, Module};
use crate::value::Value;

const NAME: &str = "Math";

pub fn module() -> Module {
    let constants: BTreeMap<String, Value> = [("PI", consts::PI), ("E", consts::E), ("TAU", consts::TAU)]
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::Number(value)))
        .collect();

    Module::new(NAME)
        .function("sum", Arity::AtLeast(2), sum)
        .function("subtract", Arity::AtLeast(2), subtract)
        .field("PI", Value::Number(consts::PI))
        .field("E", Value::Number(consts::E))
        .field("constants", Value::Map(constants))
}

fn numbers(ctx: &mut CallContext<'_>) -> Result<Vec<f64>> {
    (0..ctx.args().len()).map(|index| number_arg(ctx, NAME, index)).collect()
}

fn sum(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let total = numbers(ctx)?.into_iter().sum();
    Ok(Some(Value::Number(total)))
}

/// The first argument minus every following one
fn subtract(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let numbers = numbers(ctx)?;
    let (first, rest) = numbers
        .split_first()
        .ok_or_else(|| ctx.error("subtract() takes at least 2 arguments"))?;
    Ok(Some(Value::Number(rest.iter().fold(*first, |acc, n| acc - n))))
}
