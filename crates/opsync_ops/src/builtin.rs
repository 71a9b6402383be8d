//! Built-in ops.
//!
//! Each op reads the root value as a JSON object (anything else counts as
//! an empty object) and returns a new object. Nothing here may consult the
//! clock, randomness or any state outside its arguments.

use crate::error::{OpError, OpResult};
use crate::registry::OpFn;
use serde_json::{Map, Value};

/// Every built-in op, by registry name.
pub const BUILTIN_OPS: &[(&str, OpFn)] = &[
    ("setColor", set_color),
    ("toggleColor", toggle_color),
    ("append", append),
    ("dog", dog),
    ("stockWidgets", stock_widgets),
    ("sellWidget", sell_widget),
    ("insert", insert),
];

fn object(root: &Value) -> Map<String, Value> {
    root.as_object().cloned().unwrap_or_default()
}

fn expect_arity(op: &str, args: &[Value], expected: usize) -> OpResult<()> {
    if args.len() != expected {
        return Err(OpError::invalid_arguments(
            op,
            format!("expected {} argument(s), got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn string_arg<'a>(op: &str, args: &'a [Value], index: usize) -> OpResult<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::invalid_arguments(op, format!("argument {} must be a string", index)))
}

fn string_array(op: &str, val: &Map<String, Value>, key: &str) -> OpResult<Vec<Value>> {
    match val.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(OpError::invalid_state(
            op,
            format!("`{}` is not an array: {}", key, other),
        )),
    }
}

fn widgets(op: &str, val: &Map<String, Value>) -> OpResult<i64> {
    match val.get("widgets") {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| OpError::invalid_state(op, format!("`widgets` is not an integer: {}", v))),
    }
}

/// `setColor(name)`: sets `color`.
fn set_color(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("setColor", args, 1)?;
    let name = string_arg("setColor", args, 0)?;
    let mut val = object(root);
    val.insert("color".into(), Value::String(name.to_string()));
    Ok(Value::Object(val))
}

/// `toggleColor()`: red becomes green, anything else becomes red.
fn toggle_color(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("toggleColor", args, 0)?;
    let mut val = object(root);
    let next = match val.get("color").and_then(Value::as_str) {
        Some("red") => "green",
        _ => "red",
    };
    val.insert("color".into(), Value::String(next.into()));
    Ok(Value::Object(val))
}

/// `append(text)`: pushes onto `words`.
fn append(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("append", args, 1)?;
    let text = string_arg("append", args, 0)?;
    let mut val = object(root);
    let mut words = string_array("append", &val, "words")?;
    words.push(Value::String(text.to_string()));
    val.insert("words".into(), Value::Array(words));
    Ok(Value::Object(val))
}

/// `dog()`: tells the dog what the light means.
fn dog(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("dog", args, 0)?;
    let mut val = object(root);
    let color = val
        .get("color")
        .and_then(Value::as_str)
        .unwrap_or("unset")
        .to_string();
    let word = match color.as_str() {
        "red" => "Stop",
        "green" => "Go",
        _ => "Idle",
    };
    let command = format!(
        "{} dog {}, the light is {} now!",
        word,
        word.to_lowercase(),
        color
    );
    val.insert("command".into(), Value::String(command));
    Ok(Value::Object(val))
}

/// `stockWidgets(n)`: adds `n` to `widgets`. `n` may be an integer or a
/// decimal string.
fn stock_widgets(root: &Value, args: &[Value]) -> OpResult<Value> {
    const OP: &str = "stockWidgets";
    expect_arity(OP, args, 1)?;
    let inc = match &args[0] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| OpError::invalid_arguments(OP, format!("not an integer: {}", args[0])))?;

    let mut val = object(root);
    let total = widgets(OP, &val)?
        .checked_add(inc)
        .ok_or_else(|| OpError::invalid_state(OP, "widget count overflow"))?;
    val.insert("widgets".into(), Value::from(total));
    Ok(Value::Object(val))
}

/// `sellWidget()`: decrements `widgets` if any are in stock.
fn sell_widget(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("sellWidget", args, 0)?;
    let mut val = object(root);
    let count = widgets("sellWidget", &val)?;
    if count > 0 {
        val.insert("widgets".into(), Value::from(count - 1));
    }
    Ok(Value::Object(val))
}

/// `insert(text)`: inserts into `sorted`, before the first greater element.
fn insert(root: &Value, args: &[Value]) -> OpResult<Value> {
    expect_arity("insert", args, 1)?;
    let text = string_arg("insert", args, 0)?;
    let mut val = object(root);
    let mut sorted = string_array("insert", &val, "sorted")?;
    let idx = sorted
        .iter()
        .position(|v| v.as_str().is_some_and(|s| s > text))
        .unwrap_or(sorted.len());
    sorted.insert(idx, Value::String(text.to_string()));
    val.insert("sorted".into(), Value::Array(sorted));
    Ok(Value::Object(val))
}
