//! `String`: text manipulation

use super::string_arg;
use crate::error::Result;
use crate::module::{Arity, CallContext, Module};
use crate::value::Value;

const NAME: &str = "String";

pub fn module() -> Module {
    Module::new(NAME)
        .function("replace", Arity::Exact(3), replace)
        .function("trim", Arity::Exact(1), trim)
        .function("toLowerCase", Arity::Exact(1), to_lower_case)
        .function("chars", Arity::Exact(1), chars)
}

/// Replace the first occurrence of the second argument with the third
fn replace(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let text = string_arg(ctx, NAME, 0)?;
    let search = string_arg(ctx, NAME, 1)?;
    let replacement = string_arg(ctx, NAME, 2)?;
    Ok(Some(Value::String(text.replacen(&search, &replacement, 1))))
}

fn trim(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let text = string_arg(ctx, NAME, 0)?;
    Ok(Some(Value::String(text.trim().to_string())))
}

fn to_lower_case(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let text = string_arg(ctx, NAME, 0)?;
    Ok(Some(Value::String(text.to_lowercase())))
}

fn chars(ctx: &mut CallContext<'_>) -> Result<Option<Value>> {
    let text = string_arg(ctx, NAME, 0)?;
    let chars = text.chars().map(|c| Value::String(c.to_string())).collect();
    Ok(Some(Value::Array(chars)))
}
