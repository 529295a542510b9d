//! Parsers for values files: the YAML tree and its comment annotations.

pub mod annotation;
pub mod values;
