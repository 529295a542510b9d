//! helm-docs: generate documentation from annotated Helm chart values files.
//!
//! The core turns a values file and its comments into a [`DocumentModel`]:
//! annotations are parsed, attached to key paths, merged with subchart
//! models and sorted. Renderers turn a model into README or JSON output.

pub mod builder;
pub mod chart;
pub mod discover;
pub mod error;
pub mod generate;
pub mod model;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod sort;
pub mod toc;

pub use error::{Error, Result};
pub use generate::{Generator, Pipeline};
pub use model::DocumentModel;
pub use sort::SortOrder;
