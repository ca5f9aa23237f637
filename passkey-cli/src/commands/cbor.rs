//! CBOR decode command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use passkey_core::cbor::{self, CborValue};
use serde_json::{json, Value};
use tracing::info;

use super::Output;
use crate::utils::read_input;

/// Execute the cbor command.
pub fn execute(input: &str, from_file: bool, output: &Output) -> Result<()> {
    let bytes = read_input(input, from_file)?;
    let (value, read) = cbor::decode(&bytes).context("Failed to decode CBOR")?;
    let trailing = bytes.len() - read;

    info!(bytes_read = read, total = bytes.len(), "Decoded CBOR item");

    if output.json {
        return output.print_json(&json!({
            "bytesRead": read,
            "trailingBytes": trailing,
            "value": to_json(&value),
        }));
    }

    println!("{value}");
    if !output.quiet {
        println!();
        output.field("Bytes read", format!("{read} of {}", bytes.len()));
        if trailing > 0 {
            output.field("Trailing", format!("{trailing} bytes").yellow());
        }
    }
    Ok(())
}

/// JSON rendering of a decoded item. Byte strings become `h'..'` hex text.
pub fn to_json(value: &CborValue) -> Value {
    match value {
        CborValue::Integer(i) => i64::try_from(*i)
            .map(Value::from)
            .or_else(|_| u64::try_from(*i).map(Value::from))
            .unwrap_or_else(|_| Value::String(i.to_string())),
        CborValue::Bytes(b) => Value::String(format!("h'{}'", hex::encode(b))),
        CborValue::Text(s) => Value::String(s.clone()),
        CborValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        CborValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        CborValue::Bool(b) => Value::Bool(*b),
        CborValue::Null | CborValue::Undefined => Value::Null,
        CborValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}
