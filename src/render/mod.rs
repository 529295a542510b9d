//! Renderers and trait-based format dispatch.

pub mod json;
pub mod markdown;
pub mod template;

use crate::chart::ChartMeta;
use crate::error::Result;
use crate::model::{DocumentEntry, DocumentModel};

/// Output format of the built-in renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Markdown,
    Json,
}

/// Presentation switches that never change the model itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Leave undocumented entries out of the output
    pub ignore_non_descriptions: bool,
    pub skip_version_footer: bool,
    /// shields.io badge style
    pub badge_style: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ignore_non_descriptions: false,
            skip_version_footer: false,
            badge_style: "flat-square".to_string(),
        }
    }
}

/// One chart's metadata and finished model, as handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct ChartDocument<'a> {
    pub chart: &'a ChartMeta,
    pub model: &'a DocumentModel,
    pub options: &'a RenderOptions,
}

impl<'a> ChartDocument<'a> {
    pub fn new(chart: &'a ChartMeta, model: &'a DocumentModel, options: &'a RenderOptions) -> Self {
        Self {
            chart,
            model,
            options,
        }
    }

    fn keep(&self, entry: &DocumentEntry) -> bool {
        !self.options.ignore_non_descriptions || entry.is_documented()
    }

    /// Entries to render, after the render-time filters.
    pub fn entries(&self) -> Vec<&'a DocumentEntry> {
        let model: &'a DocumentModel = self.model;
        model.entries().into_iter().filter(|e| self.keep(e)).collect()
    }

    /// Filtered entries grouped by section; empty groups are dropped.
    pub fn sections(&self) -> Vec<(Option<&'a str>, Vec<&'a DocumentEntry>)> {
        let model: &'a DocumentModel = self.model;
        model
            .sections()
            .into_iter()
            .map(|(name, entries)| (name, entries.into_iter().filter(|e| self.keep(e)).collect::<Vec<_>>()))
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }
}

/// Trait for rendering a chart document into a specific output format.
pub trait Renderer {
    fn render(&self, doc: &ChartDocument<'_>) -> Result<String>;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format.
pub fn create_renderer(format: Format) -> Box<dyn Renderer> {
    match format {
        Format::Markdown => Box::new(markdown::MarkdownRenderer),
        Format::Json => Box::new(json::JsonRenderer),
    }
}
