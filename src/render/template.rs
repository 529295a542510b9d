//! Tera-based rendering of user-supplied README templates.

use crate::error::Result;
use crate::model::DocumentEntry;
use crate::render::markdown;
use crate::render::{ChartDocument, Renderer};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::{Context, Tera, Value};
use tracing::debug;

/// Renders the first matching template file; the others are available to
/// `{% include %}` by file name.
#[derive(Debug)]
pub struct TemplateRenderer {
    tera: Tera,
    main: String,
}

#[derive(Serialize)]
struct SectionContext<'a> {
    name: Option<&'a str>,
    anchor: String,
    entries: Vec<&'a DocumentEntry>,
}

impl TemplateRenderer {
    /// Load the template files matching `patterns`. Relative patterns are
    /// resolved against `chart_dir`. `None` when nothing matches.
    pub fn load(chart_dir: &Path, patterns: &[String]) -> Result<Option<Self>> {
        let files = expand_patterns(chart_dir, patterns)?;
        let Some(first) = files.first() else {
            return Ok(None);
        };

        let named: Vec<(PathBuf, Option<String>)> = files
            .iter()
            .map(|path| (path.clone(), Some(template_name(path))))
            .collect();
        let mut tera = Tera::default();
        tera.add_template_files(named)?;
        tera.register_filter("badge_escape", badge_escape);
        tera.register_filter("md_escape", md_escape);

        debug!(template = %first.display(), files = files.len(), "loaded templates");
        Ok(Some(Self {
            tera,
            main: template_name(first),
        }))
    }

    fn context(doc: &ChartDocument<'_>) -> Context {
        let mut slugger = markdown::section_slugger();
        let sections: Vec<SectionContext<'_>> = doc
            .sections()
            .into_iter()
            .map(|(name, entries)| SectionContext {
                name,
                anchor: slugger.slug(name.unwrap_or("Other Values")),
                entries,
            })
            .collect();

        let mut context = Context::new();
        context.insert("chart", doc.chart);
        context.insert("entries", &doc.entries());
        context.insert("sections", &sections);
        context.insert("requirements", &doc.chart.dependencies);
        context.insert("header", &markdown::header(doc.chart));
        context.insert("badges", &markdown::badges(doc.chart, &doc.options.badge_style));
        context.insert("description", &markdown::description(doc.chart));
        context.insert("homepage", &markdown::homepage(doc.chart));
        context.insert("maintainers_section", &markdown::maintainers_section(doc.chart));
        context.insert("sources_section", &markdown::sources_section(doc.chart));
        context.insert("requirements_section", &markdown::requirements_section(doc.chart));
        context.insert("values_section", &markdown::values_section(doc));
        context.insert("version_footer", &markdown::version_footer(doc));
        context
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, doc: &ChartDocument<'_>) -> Result<String> {
        Ok(self.tera.render(&self.main, &Self::context(doc))?)
    }

    fn file_extension(&self) -> &str {
        "md"
    }
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn expand_patterns(chart_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            chart_dir.join(pattern)
        };
        let mut matches: Vec<PathBuf> = glob::glob(&full.to_string_lossy())?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        matches.sort();
        for path in matches {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn string_arg<'v>(value: &'v Value, filter: &str) -> tera::Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("{} filter expects a string", filter)))
}

pub(crate) fn badge_escape(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = string_arg(value, "badge_escape")?;
    Ok(Value::String(markdown::badge_escape(s)))
}

pub(crate) fn md_escape(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = string_arg(value, "md_escape")?;
    Ok(Value::String(markdown::md_escape(s)))
}
