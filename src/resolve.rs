//! Dependency merge: splice subchart models into their parent's model.
//!
//! A subchart's entries are re-rooted under its mount key (alias or name)
//! and merged into the parent tree. Where both define a key, the parent's
//! entry wins.

use crate::error::{Error, Result};
use crate::model::*;

/// One declared dependency of a package.
#[derive(Debug, Clone)]
pub struct DependencyLink<'a> {
    /// The dependency's finished model, if it was built
    pub model: Option<&'a DocumentModel>,
    /// Key the dependency's values live under in the parent
    pub mount: String,
    /// Document the dependency's own values inside the parent
    pub include: bool,
}

impl<'a> DependencyLink<'a> {
    pub fn included(model: &'a DocumentModel, mount: impl Into<String>) -> Self {
        Self {
            model: Some(model),
            mount: mount.into(),
            include: true,
        }
    }

    /// A dependency documented only by its mount key.
    pub fn reference(mount: impl Into<String>) -> Self {
        Self {
            model: None,
            mount: mount.into(),
            include: false,
        }
    }

    fn included_model(&self) -> Option<&'a DocumentModel> {
        self.model.filter(|_| self.include)
    }
}

/// Merge dependency models into `parent`.
///
/// All links are checked for cycles before anything is merged, so a
/// failure never leaves a partially merged model behind.
pub fn merge(mut parent: DocumentModel, links: &[DependencyLink<'_>]) -> Result<DocumentModel> {
    for link in links {
        if let Some(child) = link.included_model() {
            check_cycle(&parent.package, child, &link.mount)?;
        }
    }

    for link in links {
        match link.included_model() {
            Some(child) => {
                splice(&mut parent, child, &link.mount);
                parent.included.push(IncludedPackage {
                    package: child.package.clone(),
                    key_path: link.mount.clone(),
                });
                parent
                    .included
                    .extend(child.included.iter().map(|inc| IncludedPackage {
                        package: inc.package.clone(),
                        key_path: join_prefix(&link.mount, &inc.key_path),
                    }));
            }
            None => {
                // Only the dependency's existence is documented
                mount_node(&mut parent.nodes, &link.mount);
            }
        }
    }

    Ok(parent)
}

/// Reject a child that is, or transitively includes, the parent itself.
fn check_cycle(parent: &str, child: &DocumentModel, mount: &str) -> Result<()> {
    if child.package == parent {
        return Err(Error::DependencyCycle {
            key_path: mount.to_string(),
            chain: vec![parent.to_string(), parent.to_string()],
        });
    }
    let Some(hit) = child.included.iter().find(|inc| inc.package == parent) else {
        return Ok(());
    };

    // Packages mounted along the way to the repeated parent
    let mut via: Vec<&IncludedPackage> = child
        .included
        .iter()
        .filter(|inc| inc.key_path != hit.key_path && is_path_prefix(&inc.key_path, &hit.key_path))
        .collect();
    via.sort_by_key(|inc| inc.key_path.len());

    let mut chain = vec![parent.to_string(), child.package.clone()];
    chain.extend(via.iter().map(|inc| inc.package.clone()));
    chain.push(parent.to_string());

    Err(Error::DependencyCycle {
        key_path: join_prefix(mount, &hit.key_path),
        chain,
    })
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

fn splice(parent: &mut DocumentModel, child: &DocumentModel, mount: &str) {
    let mut scoped = Vec::new();
    let mut globals = Vec::new();
    for node in &child.nodes {
        let mut node = node.clone();
        // Globals are shared with the parent rather than scoped
        if node.name == "global" {
            globals.push(node);
        } else {
            node.reroot(mount);
            scoped.push(node);
        }
    }

    let target = mount_node(&mut parent.nodes, mount);
    merge_children(&mut target.children, scoped);
    merge_children(&mut parent.nodes, globals);
}

/// Find the node at `mount`, creating plain object entries along the way.
fn mount_node<'n>(nodes: &'n mut Vec<DocumentNode>, mount: &str) -> &'n mut DocumentNode {
    let (first, rest) = match mount.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (mount, None),
    };
    let node = find_or_push(nodes, first, "");
    match rest {
        Some(rest) => descend(node, rest),
        None => node,
    }
}

fn descend<'n>(node: &'n mut DocumentNode, rest: &str) -> &'n mut DocumentNode {
    let (first, tail) = match rest.split_once('.') {
        Some((first, tail)) => (first, Some(tail)),
        None => (rest, None),
    };
    let parent_key = node.entry.key.clone();
    let child = find_or_push(&mut node.children, first, &parent_key);
    match tail {
        Some(tail) => descend(child, tail),
        None => child,
    }
}

fn find_or_push<'n>(nodes: &'n mut Vec<DocumentNode>, name: &str, parent_key: &str) -> &'n mut DocumentNode {
    let index = match nodes.iter().position(|n| n.name == name) {
        Some(index) => index,
        None => {
            nodes.push(object_node(name, &child_path(parent_key, name)));
            nodes.len() - 1
        }
    };
    &mut nodes[index]
}

fn object_node(name: &str, key: &str) -> DocumentNode {
    DocumentNode {
        name: name.to_string(),
        entry: DocumentEntry {
            key: key.to_string(),
            kind: NodeKind::Mapping,
            description: String::new(),
            default: "{}".to_string(),
            default_overridden: false,
            type_label: "object".to_string(),
            section: None,
            raw: false,
            hidden: false,
        },
        children: Vec::new(),
    }
}

fn merge_children(target: &mut Vec<DocumentNode>, incoming: Vec<DocumentNode>) {
    for node in incoming {
        match target.iter_mut().find(|t| t.name == node.name) {
            Some(existing) => merge_node(existing, node),
            None => target.push(node),
        }
    }
}

/// The parent's default, type and visibility always win; description and
/// section fall back to the child's when the parent has none.
fn merge_node(parent: &mut DocumentNode, child: DocumentNode) {
    if parent.entry.description.is_empty() {
        parent.entry.description = child.entry.description;
        parent.entry.raw = child.entry.raw;
    }
    if parent.entry.section.is_none() {
        parent.entry.section = child.entry.section;
    }
    merge_children(&mut parent.children, child.children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::parser::annotation::AnnotationParser;
    use crate::parser::values;

    fn model(package: &str, input: &str) -> DocumentModel {
        let config = values::parse(input).unwrap();
        let annotations = AnnotationParser::default().parse(input, &config);
        builder::build(package, &config, &annotations)
    }

    fn keys(model: &DocumentModel) -> Vec<&str> {
        model.entries().iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn excluded_dependency_is_a_plain_entry() {
        let parent = model("parent", "a: 1\n");
        let merged = merge(parent, &[DependencyLink::reference("redis")]).unwrap();
        assert_eq!(keys(&merged), vec!["a", "redis"]);
        let redis = &merged.find("redis").unwrap().entry;
        assert_eq!(redis.type_label, "object");
        assert_eq!(redis.default, "{}");
        assert!(merged.included.is_empty());
    }

    #[test]
    fn excluded_dependency_keeps_parent_overrides() {
        let parent = model("parent", "# -- Redis overrides\nredis:\n  enabled: true\n");
        let child = model("redis", "enabled: false\nport: 6379\n");
        let link = DependencyLink {
            model: Some(&child),
            mount: "redis".to_string(),
            include: false,
        };
        let merged = merge(parent, &[link]).unwrap();
        assert_eq!(keys(&merged), vec!["redis", "redis.enabled"]);
    }

    #[test]
    fn included_dependency_is_rerooted() {
        let parent = model("parent", "a: 1\n");
        let child = model("child", "image:\n  tag: latest\nlist: [x]\n");
        let merged = merge(parent, &[DependencyLink::included(&child, "sub")]).unwrap();
        assert_eq!(
            keys(&merged),
            vec!["a", "sub.image.tag", "sub.list[0]"]
        );
        assert_eq!(
            merged.included,
            vec![IncludedPackage {
                package: "child".to_string(),
                key_path: "sub".to_string()
            }]
        );
    }

    #[test]
    fn parent_overrides_win() {
        let parent = model(
            "parent",
            "sub:\n  # -- Parent docs\n  x: 2\n  y: 3\n",
        );
        let child = model(
            "child",
            "# -- Child docs\nx: 1\n# -- Child y\n# @section -- Misc\ny: 1\nz: 1\n",
        );
        let merged = merge(parent, &[DependencyLink::included(&child, "sub")]).unwrap();
        let x = &merged.find("sub.x").unwrap().entry;
        assert_eq!(x.description, "Parent docs");
        assert_eq!(x.default, "2");

        // Undocumented in the parent: the child's description fills in
        let y = &merged.find("sub.y").unwrap().entry;
        assert_eq!(y.description, "Child y");
        assert_eq!(y.section.as_deref(), Some("Misc"));
        assert_eq!(y.default, "3");

        assert_eq!(keys(&merged), vec!["sub.x", "sub.y", "sub.z"]);
    }

    #[test]
    fn parent_hidden_wins() {
        let parent = model("parent", "sub:\n  # @ignored\n  x: 2\n");
        let child = model("child", "# -- Visible in child\nx: 1\n");
        let merged = merge(parent, &[DependencyLink::included(&child, "sub")]).unwrap();
        assert!(merged.entries().is_empty());
    }

    #[test]
    fn globals_stay_at_root() {
        let parent = model("parent", "global:\n  domain: example.com\n");
        let child = model("child", "global:\n  registry: docker.io\nname: c\n");
        let merged = merge(parent, &[DependencyLink::included(&child, "sub")]).unwrap();
        assert_eq!(
            keys(&merged),
            vec!["global.domain", "global.registry", "sub.name"]
        );
    }

    #[test]
    fn transitive_inclusions_are_recorded() {
        let leaf = model("leaf", "v: 1\n");
        let mid = merge(model("mid", "m: 1\n"), &[DependencyLink::included(&leaf, "leaf")]).unwrap();
        let top = merge(model("top", "t: 1\n"), &[DependencyLink::included(&mid, "mid")]).unwrap();
        assert_eq!(keys(&top), vec!["t", "mid.m", "mid.leaf.v"]);
        assert!(top
            .included
            .iter()
            .any(|inc| inc.package == "leaf" && inc.key_path == "mid.leaf"));
    }

    #[test]
    fn self_inclusion_is_a_cycle() {
        let a = model("a", "x: 1\n");
        let again = a.clone();
        let err = merge(a, &[DependencyLink::included(&again, "a")]).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { ref key_path, .. } if key_path == "a"));
    }

    #[test]
    fn transitive_cycle_is_rejected() {
        let a = model("a", "x: 1\n");
        let b = merge(model("b", "y: 1\n"), &[DependencyLink::included(&a, "a")]).unwrap();
        let err = merge(model("a", "x: 1\n"), &[DependencyLink::included(&b, "b")]).unwrap_err();
        match err {
            Error::DependencyCycle { key_path, chain } => {
                assert_eq!(key_path, "b.a");
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
