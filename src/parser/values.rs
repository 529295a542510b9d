//! Values file parsing: YAML text → `ConfigNode` tree.

use crate::error::{Error, Result};
use crate::model::*;
use serde_yaml::Value;

/// Parse a values file into its raw YAML structure.
///
/// An empty document is an empty mapping.
pub fn parse_yaml(input: &str) -> Result<Value> {
    if input.trim().is_empty() {
        return Ok(Value::Mapping(Default::default()));
    }
    Ok(serde_yaml::from_str(input)?)
}

/// Build the `ConfigNode` tree for a parsed values document.
///
/// The root is an unnamed mapping node with an empty path.
pub fn config_tree(value: &Value) -> Result<ConfigNode> {
    match untag(value) {
        Value::Mapping(_) => Ok(convert(String::new(), String::new(), value)),
        Value::Null => Ok(ConfigNode {
            key: String::new(),
            path: String::new(),
            value: NodeValue::Mapping,
            children: Vec::new(),
        }),
        other => Err(Error::MalformedValues(format!(
            "top-level value must be a mapping, found {}",
            describe(other)
        ))),
    }
}

/// Parse a values file straight into its `ConfigNode` tree.
pub fn parse(input: &str) -> Result<ConfigNode> {
    config_tree(&parse_yaml(input)?)
}

fn convert(key: String, path: String, value: &Value) -> ConfigNode {
    match untag(value) {
        Value::Mapping(map) => {
            let children = map
                .iter()
                .map(|(k, v)| {
                    let name = key_string(k);
                    let child = child_path(&path, &name);
                    convert(name, child, v)
                })
                .collect();
            ConfigNode {
                key,
                path,
                value: NodeValue::Mapping,
                children,
            }
        }
        Value::Sequence(items) => {
            let children = items
                .iter()
                .enumerate()
                .map(|(i, v)| convert(format!("[{}]", i), index_path(&path, i), v))
                .collect();
            ConfigNode {
                key,
                path,
                value: NodeValue::Sequence,
                children,
            }
        }
        other => ConfigNode {
            key,
            path,
            value: NodeValue::Scalar(scalar(other)),
            children: Vec::new(),
        },
    }
}

fn scalar(value: &Value) -> Scalar {
    match value {
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            // u64 beyond i64 range still reads as a float
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Scalar::String(s.clone()),
        _ => Scalar::Null,
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Mapping keys are usually strings; anything else is stringified.
fn key_string(key: &Value) -> String {
    match untag(key) {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
