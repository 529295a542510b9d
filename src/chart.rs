//! Chart metadata from `Chart.yaml` (and legacy `requirements.yaml`).

use crate::generate::{DependencySpec, Package};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors for chart loading
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Dependency {
    /// Key the dependency's values live under in the parent.
    pub fn mount_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Local chart directory of a `file://` repository, relative to the parent.
    pub fn local_path(&self) -> Option<&str> {
        self.repository.as_deref()?.strip_prefix("file://")
    }
}

/// The parts of `Chart.yaml` the documentation uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub api_version: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub app_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Default, Deserialize)]
struct Requirements {
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

impl ChartMeta {
    pub fn parse(input: &str, path: &Path) -> Result<Self, ChartError> {
        serde_yaml::from_str(input).map_err(|source| ChartError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `apiVersion: v1` charts, or charts that omit it, list their
    /// dependencies in `requirements.yaml`.
    pub fn is_legacy(&self) -> bool {
        matches!(self.api_version.as_deref(), None | Some("v1"))
    }

    /// Load `Chart.yaml` from a chart directory, folding in
    /// `requirements.yaml` dependencies for v1 charts.
    pub fn load(chart_dir: &Path) -> Result<Self, ChartError> {
        let path = chart_dir.join("Chart.yaml");
        let mut meta = Self::parse(&read(&path)?, &path)?;

        let requirements = chart_dir.join("requirements.yaml");
        if meta.is_legacy() && meta.dependencies.is_empty() && requirements.is_file() {
            let parsed: Requirements = serde_yaml::from_str(&read(&requirements)?).map_err(
                |source| ChartError::Parse {
                    path: requirements.clone(),
                    source,
                },
            )?;
            meta.dependencies = parsed.dependencies;
        }

        Ok(meta)
    }
}

/// A chart directory with its metadata and raw values text.
#[derive(Debug, Clone)]
pub struct Chart {
    /// Canonical chart directory, also the chart's package identity
    pub dir: PathBuf,
    pub meta: ChartMeta,
    pub values: String,
}

impl Chart {
    /// Load a chart. A missing values file is treated as empty.
    pub fn load(dir: &Path, values_file: &str) -> Result<Self, ChartError> {
        let dir = fs::canonicalize(dir).map_err(|source| ChartError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let meta = ChartMeta::load(&dir)?;
        let values_path = dir.join(values_file);
        let values = if values_path.is_file() {
            read(&values_path)?
        } else {
            debug!(chart = %meta.name, "no {} found, documenting no values", values_file);
            String::new()
        };
        Ok(Self { dir, meta, values })
    }

    pub fn id(&self) -> String {
        self.dir.display().to_string()
    }

    /// Directory of a dependency available on disk, if any.
    pub fn local_dependency(&self, dep: &Dependency) -> Option<PathBuf> {
        let candidate = match dep.local_path() {
            Some(path) => self.dir.join(path),
            None => self.dir.join("charts").join(&dep.name),
        };
        if !candidate.join("Chart.yaml").is_file() {
            return None;
        }
        Some(fs::canonicalize(&candidate).unwrap_or(candidate))
    }

    /// Generation inputs for this chart. Dependencies are included only
    /// when `include_dependencies` is set and the chart is on disk.
    pub fn package(&self, include_dependencies: bool) -> Package {
        let dependencies = self
            .meta
            .dependencies
            .iter()
            .map(|dep| {
                let local = self.local_dependency(dep);
                if local.is_none() {
                    debug!(chart = %self.meta.name, dependency = %dep.name, "dependency is not local");
                }
                DependencySpec {
                    package: local
                        .as_ref()
                        .map(|dir| dir.display().to_string())
                        .unwrap_or_else(|| dep.name.clone()),
                    mount: dep.mount_key().to_string(),
                    include: include_dependencies && local.is_some(),
                }
            })
            .collect();
        Package {
            id: self.id(),
            values: self.values.clone(),
            dependencies,
        }
    }
}

/// Versions are often written unquoted (`appVersion: 1.16`).
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a version string, found {:?}",
            other
        ))),
    }
}

fn read(path: &Path) -> Result<String, ChartError> {
    fs::read_to_string(path).map_err(|source| ChartError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"apiVersion: v2
name: web
version: 1.2.3
appVersion: "2.0"
description: A web server
type: application
home: https://example.com
sources:
  - https://github.com/example/web
maintainers:
  - name: ops
    email: ops@example.com
dependencies:
  - name: redis
    version: 17.0.0
    repository: https://charts.example.com
    alias: cache
  - name: common
    repository: file://../common
"#;

    #[test]
    fn parses_metadata() {
        let meta = ChartMeta::parse(CHART, Path::new("Chart.yaml")).unwrap();
        assert_eq!(meta.name, "web");
        assert_eq!(meta.version.as_deref(), Some("1.2.3"));
        assert_eq!(meta.app_version.as_deref(), Some("2.0"));
        assert_eq!(meta.chart_type.as_deref(), Some("application"));
        assert_eq!(meta.maintainers[0].email.as_deref(), Some("ops@example.com"));
        assert_eq!(meta.dependencies.len(), 2);
    }

    #[test]
    fn unquoted_versions() {
        let meta = ChartMeta::parse("name: x\nversion: 1.0\nappVersion: 1.16\n", Path::new("Chart.yaml")).unwrap();
        assert_eq!(meta.version.as_deref(), Some("1.0"));
        assert_eq!(meta.app_version.as_deref(), Some("1.16"));
    }

    #[test]
    fn dependency_mounts() {
        let meta = ChartMeta::parse(CHART, Path::new("Chart.yaml")).unwrap();
        assert_eq!(meta.dependencies[0].mount_key(), "cache");
        assert_eq!(meta.dependencies[0].local_path(), None);
        assert_eq!(meta.dependencies[1].mount_key(), "common");
        assert_eq!(meta.dependencies[1].local_path(), Some("../common"));
    }

    #[test]
    fn requirements_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Chart.yaml"), "apiVersion: v1\nname: legacy\n").unwrap();
        fs::write(
            dir.path().join("requirements.yaml"),
            "dependencies:\n  - name: mysql\n    version: 1.0.0\n",
        )
        .unwrap();
        let meta = ChartMeta::load(dir.path()).unwrap();
        assert_eq!(meta.dependencies[0].name, "mysql");
    }

    #[test]
    fn requirements_file_ignored_for_v2() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Chart.yaml"), "apiVersion: v2\nname: modern\n").unwrap();
        fs::write(
            dir.path().join("requirements.yaml"),
            "dependencies:\n  - name: mysql\n",
        )
        .unwrap();
        let meta = ChartMeta::load(dir.path()).unwrap();
        assert!(!meta.is_legacy());
        assert!(meta.dependencies.is_empty());
    }

    fn write_chart(dir: &Path, chart_yaml: &str, values: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("Chart.yaml"), chart_yaml).unwrap();
        fs::write(dir.join("values.yaml"), values).unwrap();
    }

    #[test]
    fn package_resolves_local_dependencies() {
        let root = tempfile::tempdir().unwrap();
        let parent = root.path().join("web");
        write_chart(
            &parent,
            "name: web\ndependencies:\n  - name: common\n    repository: file://../common\n  - name: redis\n    alias: cache\n  - name: postgres\n    repository: https://charts.example.com\n",
            "a: 1\n",
        );
        write_chart(&root.path().join("common"), "name: common\n", "c: 1\n");
        write_chart(&parent.join("charts").join("redis"), "name: redis\n", "port: 6379\n");

        let chart = Chart::load(&parent, "values.yaml").unwrap();
        let package = chart.package(true);
        assert_eq!(package.values, "a: 1\n");

        let deps = &package.dependencies;
        let common = fs::canonicalize(root.path().join("common")).unwrap();
        assert_eq!(deps[0].package, common.display().to_string());
        assert!(deps[0].include);
        assert_eq!(deps[1].mount, "cache");
        assert!(deps[1].include);
        assert_eq!(deps[2].package, "postgres");
        assert!(!deps[2].include);

        assert!(chart.package(false).dependencies.iter().all(|d| !d.include));
    }

    #[test]
    fn missing_values_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Chart.yaml"), "name: bare\n").unwrap();
        let chart = Chart::load(dir.path(), "values.yaml").unwrap();
        assert!(chart.values.is_empty());
    }

    #[test]
    fn missing_chart_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ChartMeta::load(dir.path()), Err(ChartError::Read { .. })));
    }
}
