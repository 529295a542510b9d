//! Generation pipeline: parse → build → resolve dependencies → sort.
//!
//! [`Generator`] runs the pipeline for a table of packages, building each
//! package at most once no matter how many parents depend on it.

use crate::builder;
use crate::error::{Error, Result};
use crate::model::DocumentModel;
use crate::parser::annotation::AnnotationParser;
use crate::parser::values;
use crate::resolve::{self, DependencyLink};
use crate::sort::{self, SortOrder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// A dependency as declared by a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// Identity of the depended-upon package
    pub package: String,
    /// Key its values are mounted under
    pub mount: String,
    pub include: bool,
}

/// Inputs of one generation unit, already read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: String,
    /// Values file text, comments included
    pub values: String,
    pub dependencies: Vec<DependencySpec>,
}

/// Settings shared by every generation unit.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub parser: AnnotationParser,
    pub sort_order: SortOrder,
}

impl Pipeline {
    /// Run the pipeline for one package whose dependencies are already built.
    pub fn run(&self, id: &str, source: &str, links: &[DependencyLink<'_>]) -> Result<DocumentModel> {
        let raw = values::parse_yaml(source)?;
        let config = values::config_tree(&raw)?;
        let annotations = self.parser.parse(source, &config);
        let model = builder::build(id, &config, &annotations);
        let merged = resolve::merge(model, links)?;
        Ok(sort::sort(merged, self.sort_order))
    }
}

/// Builds document models for a set of packages, memoised by identity.
#[derive(Debug, Default)]
pub struct Generator {
    pipeline: Pipeline,
    packages: BTreeMap<String, Package>,
    cache: HashMap<String, Arc<DocumentModel>>,
    /// Packages currently being built, with the key they are mounted at
    stack: Vec<(String, String)>,
    builds: usize,
}

impl Generator {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            ..Default::default()
        }
    }

    pub fn add(&mut self, package: Package) {
        self.packages.insert(package.id.clone(), package);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(id)
    }

    /// Number of pipeline runs so far.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// The document model of `id`, building it and its dependencies first.
    pub fn generate(&mut self, id: &str) -> Result<Arc<DocumentModel>> {
        self.generate_at(id, "")
    }

    fn generate_at(&mut self, id: &str, mount: &str) -> Result<Arc<DocumentModel>> {
        if let Some(model) = self.cache.get(id) {
            return Ok(Arc::clone(model));
        }
        if let Some(start) = self.stack.iter().position(|(p, _)| p == id) {
            return Err(self.cycle_error(start, id, mount));
        }
        let package = self
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownPackage(id.to_string()))?;

        self.stack.push((id.to_string(), mount.to_string()));
        let result = self.build(&package);
        self.stack.pop();

        let model = Arc::new(result?);
        self.cache.insert(id.to_string(), Arc::clone(&model));
        Ok(model)
    }

    fn build(&mut self, package: &Package) -> Result<DocumentModel> {
        let mut children: Vec<(Option<Arc<DocumentModel>>, &DependencySpec)> = Vec::new();
        for dep in &package.dependencies {
            if !dep.include {
                children.push((None, dep));
            } else if self.contains(&dep.package) {
                let child = self.generate_at(&dep.package, &dep.mount)?;
                children.push((Some(child), dep));
            } else {
                warn!(
                    package = %package.id,
                    dependency = %dep.package,
                    "dependency not found, documenting it by key only"
                );
                children.push((None, dep));
            }
        }

        let links: Vec<DependencyLink<'_>> = children
            .iter()
            .map(|(model, dep)| match model {
                Some(model) => DependencyLink::included(model, dep.mount.clone()),
                None => DependencyLink::reference(dep.mount.clone()),
            })
            .collect();

        debug!(package = %package.id, dependencies = links.len(), "building document model");
        self.builds += 1;
        self.pipeline.run(&package.id, &package.values, &links)
    }

    fn cycle_error(&self, start: usize, id: &str, mount: &str) -> Error {
        let mut chain: Vec<String> = self.stack[start..].iter().map(|(p, _)| p.clone()).collect();
        chain.push(id.to_string());
        let key_path = self.stack[start + 1..]
            .iter()
            .map(|(_, m)| m.as_str())
            .chain(std::iter::once(mount))
            .collect::<Vec<_>>()
            .join(".");
        Error::DependencyCycle { key_path, chain }
    }
}
