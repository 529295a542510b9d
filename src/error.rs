//! Errors raised while building or rendering a document model.

/// Core errors. Any of these aborts the affected package only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dependency cycle at key path '{key_path}': {}", chain.join(" -> "))]
    DependencyCycle {
        key_path: String,
        chain: Vec<String>,
    },

    #[error("malformed values: {0}")]
    MalformedValues(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown package: {0}")]
    UnknownPackage(String),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("invalid template pattern: {0}")]
    TemplatePattern(#[from] glob::PatternError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
