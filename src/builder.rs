//! Value tree builder: `ConfigNode` tree + annotations → `DocumentModel`.

use crate::model::*;
use crate::parser::annotation::AnnotationMap;
use regex::Regex;
use std::sync::LazyLock;

// Plain scalars YAML would read back as something other than a string
static RE_NON_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:~|null|Null|NULL|true|True|TRUE|false|False|FALSE",
        r"|y|Y|yes|Yes|YES|n|N|no|No|NO|on|On|ON|off|Off|OFF",
        r"|[-+]?(?:[0-9][0-9_]*)?\.?[0-9]+(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?[0-9]+\.|0x[0-9a-fA-F]+|0o[0-7]+",
        r"|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$"
    ))
    .unwrap()
});

const INDICATORS: &[char] = &[
    ':', '#', '{', '}', '[', ']', ',', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`', '\n',
];

/// Build the document model of one package.
///
/// Every node of `config` yields exactly one `DocumentNode`; nodes without
/// an annotation get an empty description and inferred type and default.
pub fn build(package: &str, config: &ConfigNode, annotations: &AnnotationMap) -> DocumentModel {
    let nodes = config
        .children
        .iter()
        .map(|child| build_node(child, annotations))
        .collect();
    DocumentModel::new(package, nodes)
}

fn build_node(node: &ConfigNode, annotations: &AnnotationMap) -> DocumentNode {
    let annotation = annotations.get(&node.path).cloned().unwrap_or_default();

    let (default, default_overridden) = match annotation.default_override {
        Some(text) => (text, true),
        None => (render_default(&node.value, node.is_leaf()), false),
    };
    let type_label = annotation
        .type_override
        .unwrap_or_else(|| infer_type(&node.value).to_string());

    DocumentNode {
        name: node.key.clone(),
        entry: DocumentEntry {
            key: node.path.clone(),
            kind: node.kind(),
            description: annotation.description,
            default,
            default_overridden,
            type_label,
            section: annotation.section,
            raw: annotation.raw,
            hidden: annotation.hidden,
        },
        children: node
            .children
            .iter()
            .map(|child| build_node(child, annotations))
            .collect(),
    }
}

/// Type label inferred from a node's value.
pub fn infer_type(value: &NodeValue) -> &'static str {
    match value {
        NodeValue::Scalar(scalar) => scalar.type_label(),
        NodeValue::Mapping => "object",
        NodeValue::Sequence => "list",
    }
}

/// Render a default value in canonical scalar notation.
///
/// Composites are abbreviated to keep tables compact.
pub fn render_default(value: &NodeValue, empty: bool) -> String {
    match value {
        NodeValue::Mapping if empty => "{}".to_string(),
        NodeValue::Mapping => "{...}".to_string(),
        NodeValue::Sequence if empty => "[]".to_string(),
        NodeValue::Sequence => "[...]".to_string(),
        NodeValue::Scalar(scalar) => render_scalar(scalar),
    }
}

fn render_scalar(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null => "nil".to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => render_float(*f),
        Scalar::String(s) if is_ambiguous(s) => quote(s),
        Scalar::String(s) => s.clone(),
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}.inf", sign)
    } else {
        // Debug keeps the decimal point: 1.0 rather than 1
        format!("{:?}", f)
    }
}

/// A string that would not read back as the same string if left bare.
fn is_ambiguous(s: &str) -> bool {
    s.is_empty()
        || s.trim() != s
        || s.starts_with('-')
        || s.starts_with('?')
        || s.contains(INDICATORS)
        || RE_NON_STRING.is_match(s)
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}
