//! JSON renderer: structured output for tooling integration.

use crate::chart::ChartMeta;
use crate::error::Result;
use crate::model::{DocumentEntry, IncludedPackage};
use crate::render::{ChartDocument, Renderer};
use serde::Serialize;

pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonDocument<'a> {
    chart: &'a ChartMeta,
    values: Vec<&'a DocumentEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included: &'a Vec<IncludedPackage>,
}

impl Renderer for JsonRenderer {
    fn render(&self, doc: &ChartDocument<'_>) -> Result<String> {
        let out = JsonDocument {
            chart: doc.chart,
            values: doc.entries(),
            included: &doc.model.included,
        };
        let mut json = serde_json::to_string_pretty(&out)?;
        json.push('\n');
        Ok(json)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
