//! Op command implementation.

use super::{CliError, Context};
use serde_json::Value;
use std::path::Path;

/// Runs the op command.
pub fn run(
    ctx: &Context,
    db: &Path,
    name: &str,
    args: &[String],
    json_args: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(args, json_args)?;
    let engine = ctx.engine(db)?;
    let commit = engine.op(name, args)?;
    println!("{}", commit);
    Ok(())
}

/// Converts command-line arguments to op arguments.
///
/// Without `json`, every argument is taken verbatim as a JSON string.
pub fn parse_args(args: &[String], json: bool) -> Result<Vec<Value>, CliError> {
    if !json {
        return Ok(args.iter().cloned().map(Value::String).collect());
    }

    args.iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_str(raw).map_err(|e| CliError::InvalidJsonArg {
                index,
                input: raw.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_args_are_strings() {
        let args = parse_args(&strings(&["5", "red"]), false).unwrap();
        assert_eq!(args, vec![json!("5"), json!("red")]);
    }

    #[test]
    fn json_args_are_parsed() {
        let args = parse_args(&strings(&["5", "\"red\"", "[1,2]"]), true).unwrap();
        assert_eq!(args, vec![json!(5), json!("red"), json!([1, 2])]);
    }

    #[test]
    fn bad_json_arg_names_its_position() {
        let err = parse_args(&strings(&["1", "red"]), true).unwrap_err();
        assert!(matches!(err, CliError::InvalidJsonArg { index: 1, .. }));
    }
}
