//! Data model for chart values documentation, independent of output format.
//!
//! `ConfigNode` mirrors the values file as parsed; `DocumentNode` is the
//! same tree with annotations resolved, ready for rendering.

use serde::Serialize;

/// A scalar value as it appears in a values file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Type label used when no `@type` override is present.
    pub fn type_label(&self) -> &'static str {
        match self {
            Scalar::String(_) | Scalar::Null => "string",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
        }
    }
}

/// Value carried by a [`ConfigNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Scalar(Scalar),
    Mapping,
    Sequence,
}

/// Shape of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Scalar,
    Mapping,
    Sequence,
}

/// One key of the values tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    /// Key among its siblings: a mapping key or `[index]`
    pub key: String,
    /// Full key path from the root, e.g. `image.tag` or `hosts[0].name`
    pub path: String,
    pub value: NodeValue,
    /// Children in declaration order (mapping/sequence only)
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn kind(&self) -> NodeKind {
        match self.value {
            NodeValue::Scalar(_) => NodeKind::Scalar,
            NodeValue::Mapping => NodeKind::Mapping,
            NodeValue::Sequence => NodeKind::Sequence,
        }
    }

    /// A node without children, including empty mappings and sequences.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Every key path in this subtree, this node included unless it is the root.
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.path.is_empty() {
            out.push(&self.path);
        }
        for child in &self.children {
            child.collect_paths(out);
        }
    }
}

/// Documentation metadata for one key path, extracted from comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub description: String,
    pub default_override: Option<String>,
    pub type_override: Option<String>,
    pub section: Option<String>,
    pub hidden: bool,
    /// Keep line breaks in the description when rendering
    pub raw: bool,
}

/// The rendering unit: one node with its annotation resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    /// Full key path
    pub key: String,
    pub kind: NodeKind,
    pub description: String,
    /// Rendered default value
    pub default: String,
    /// True when `default` came verbatim from an `@default` annotation
    pub default_overridden: bool,
    #[serde(rename = "type")]
    pub type_label: String,
    pub section: Option<String>,
    pub raw: bool,
    pub hidden: bool,
}

impl DocumentEntry {
    /// An entry with no explicit description.
    pub fn is_documented(&self) -> bool {
        !self.description.is_empty()
    }
}

/// A node of the finalized documentation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentNode {
    /// Key among its siblings, used for ordering
    pub name: String,
    pub entry: DocumentEntry,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Prefix every key path in this subtree with `prefix`.
    pub fn reroot(&mut self, prefix: &str) {
        self.entry.key = join_prefix(prefix, &self.entry.key);
        for child in &mut self.children {
            child.reroot(prefix);
        }
    }

    fn collect_entries<'a>(&'a self, out: &mut Vec<&'a DocumentEntry>) {
        if self.entry.hidden {
            return;
        }
        if self.children.is_empty() || self.entry.is_documented() {
            out.push(&self.entry);
        }
        for child in &self.children {
            child.collect_entries(out);
        }
    }

    fn find(&self, path: &str) -> Option<&DocumentNode> {
        if self.entry.key == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }
}

/// A package merged into a model, with the key path it was mounted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludedPackage {
    pub package: String,
    pub key_path: String,
}

/// The finalized, ordered documentation tree of one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentModel {
    /// Package identity
    pub package: String,
    pub nodes: Vec<DocumentNode>,
    /// Packages merged in, transitively
    pub included: Vec<IncludedPackage>,
}

impl DocumentModel {
    pub fn new(package: impl Into<String>, nodes: Vec<DocumentNode>) -> Self {
        Self {
            package: package.into(),
            nodes,
            included: Vec::new(),
        }
    }

    /// Visible entries, depth-first: every leaf plus every documented branch.
    pub fn entries(&self) -> Vec<&DocumentEntry> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_entries(&mut out);
        }
        out
    }

    /// Look up a node by full key path, hidden nodes included.
    pub fn find(&self, path: &str) -> Option<&DocumentNode> {
        self.nodes.iter().find_map(|n| n.find(path))
    }

    /// Visible entries grouped by section label, in first-seen order.
    /// Entries without a section come last under `None`.
    pub fn sections(&self) -> Vec<(Option<&str>, Vec<&DocumentEntry>)> {
        let mut named: Vec<(Option<&str>, Vec<&DocumentEntry>)> = Vec::new();
        let mut other: Vec<&DocumentEntry> = Vec::new();
        for entry in self.entries() {
            match entry.section.as_deref() {
                Some(section) => match named.iter_mut().find(|(s, _)| *s == Some(section)) {
                    Some((_, list)) => list.push(entry),
                    None => named.push((Some(section), vec![entry])),
                },
                None => other.push(entry),
            }
        }
        if !other.is_empty() {
            named.push((None, other));
        }
        named
    }
}

/// Key path of a mapping child.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Key path of a sequence item.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Prefix a key path, keeping `[i]` attached to its parent.
pub fn join_prefix(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        prefix.to_string()
    } else if path.starts_with('[') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}.{}", prefix, path)
    }
}
