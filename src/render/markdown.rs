//! GitHub-flavored markdown README renderer.
//!
//! Each block of the README is also exposed on its own so custom templates
//! can reuse them.

use crate::chart::ChartMeta;
use crate::error::Result;
use crate::model::DocumentEntry;
use crate::render::{ChartDocument, Renderer};
use crate::toc::{self, Slugger};

pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, doc: &ChartDocument<'_>) -> Result<String> {
        let blocks = [
            header(doc.chart),
            badges(doc.chart, &doc.options.badge_style),
            description(doc.chart),
            homepage(doc.chart),
            maintainers_section(doc.chart),
            sources_section(doc.chart),
            requirements_section(doc.chart),
            values_section(doc),
            version_footer(doc),
        ];

        let mut output = String::new();
        for block in blocks.iter().filter(|b| !b.is_empty()) {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(block);
        }
        Ok(output)
    }

    fn file_extension(&self) -> &str {
        "md"
    }
}

pub fn header(chart: &ChartMeta) -> String {
    format!("# {}\n", chart.name)
}

/// Escape text for a shields.io static badge path segment.
pub fn badge_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '-' => out.push_str("--"),
            '_' => out.push_str("__"),
            ' ' => out.push('_'),
            c => out.push(c),
        }
    }
    out
}

fn badge(label: &str, message: &str, color: &str, style: &str) -> String {
    format!(
        "![{label}: {message}](https://img.shields.io/badge/{}-{}-{color}?style={style})",
        badge_escape(label),
        badge_escape(message),
    )
}

pub fn badges(chart: &ChartMeta, style: &str) -> String {
    let mut parts = Vec::new();
    if let Some(ref version) = chart.version {
        parts.push(badge("Version", version, "informational", style));
    }
    if let Some(ref chart_type) = chart.chart_type {
        parts.push(badge("Type", chart_type, "informational", style));
    }
    if let Some(ref app_version) = chart.app_version {
        parts.push(badge("AppVersion", app_version, "informational", style));
    }
    if parts.is_empty() {
        return String::new();
    }
    format!("{}\n", parts.join(" "))
}

pub fn description(chart: &ChartMeta) -> String {
    match chart.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!("{}\n", text),
        _ => String::new(),
    }
}

pub fn homepage(chart: &ChartMeta) -> String {
    match chart.home {
        Some(ref home) if !home.is_empty() => format!("**Homepage:** <{}>\n", home),
        _ => String::new(),
    }
}

pub fn maintainers_section(chart: &ChartMeta) -> String {
    if chart.maintainers.is_empty() {
        return String::new();
    }
    let mut lines = vec![
        "## Maintainers\n".to_string(),
        "| Name | Email | Url |".to_string(),
        "| ---- | ------ | --- |".to_string(),
    ];
    for m in &chart.maintainers {
        lines.push(format!(
            "| {} | {} | {} |",
            md_escape(&m.name),
            m.email.as_deref().map(|e| format!("<{}>", e)).unwrap_or_default(),
            m.url.as_deref().map(|u| format!("<{}>", u)).unwrap_or_default(),
        ));
    }
    lines.join("\n") + "\n"
}

pub fn sources_section(chart: &ChartMeta) -> String {
    if chart.sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Source Code\n\n");
    for source in &chart.sources {
        out.push_str(&format!("* <{}>\n", source));
    }
    out
}

pub fn requirements_section(chart: &ChartMeta) -> String {
    if chart.dependencies.is_empty() {
        return String::new();
    }
    let mut lines = vec![
        "## Requirements\n".to_string(),
        "| Repository | Name | Version |".to_string(),
        "|------------|------|---------|".to_string(),
    ];
    for dep in &chart.dependencies {
        let name = match dep.alias {
            Some(ref alias) => format!("{}({})", dep.name, alias),
            None => dep.name.clone(),
        };
        lines.push(format!(
            "| {} | {} | {} |",
            dep.repository.as_deref().unwrap_or_default(),
            md_escape(&name),
            dep.version.as_deref().unwrap_or_default(),
        ));
    }
    lines.join("\n") + "\n"
}

/// The values tables. With sections, one table per section under an index;
/// unsectioned entries are listed last as "Other Values".
pub fn values_section(doc: &ChartDocument<'_>) -> String {
    let sections = doc.sections();
    if sections.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Values\n\n");
    if sections.iter().all(|(name, _)| name.is_none()) {
        out.push_str(&values_table(&sections[0].1));
        return out;
    }

    let mut slugger = section_slugger();
    let headings: Vec<(&str, String)> = sections
        .iter()
        .map(|(name, _)| {
            let heading = name.unwrap_or("Other Values");
            (heading, slugger.slug(heading))
        })
        .collect();

    for (heading, anchor) in &headings {
        out.push_str(&toc::render_toc_item(heading, anchor));
        out.push('\n');
    }
    for ((heading, _), (_, entries)) in headings.iter().zip(&sections) {
        out.push_str(&format!("\n### {}\n\n", heading));
        out.push_str(&values_table(entries));
    }
    out
}

/// Slugger for section headings; `#values` already belongs to the
/// "## Values" heading.
pub(crate) fn section_slugger() -> Slugger {
    let mut slugger = Slugger::default();
    slugger.slug("Values");
    slugger
}

fn values_table(entries: &[&DocumentEntry]) -> String {
    let mut lines = vec![
        "| Key | Type | Default | Description |".to_string(),
        "|-----|------|---------|-------------|".to_string(),
    ];
    for entry in entries {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            md_escape(&entry.key),
            md_escape(&entry.type_label),
            default_cell(entry),
            description_cell(entry),
        ));
    }
    lines.join("\n") + "\n"
}

fn default_cell(entry: &DocumentEntry) -> String {
    if entry.default.is_empty() {
        return String::new();
    }
    format!("`{}`", entry.default.replace('|', "\\|").replace('\n', " "))
}

fn description_cell(entry: &DocumentEntry) -> String {
    if entry.raw {
        md_escape(&entry.description)
    } else {
        let joined = entry
            .description
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        md_escape(joined.trim())
    }
}

/// Make text safe inside a table cell.
pub fn md_escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

pub fn version_footer(doc: &ChartDocument<'_>) -> String {
    if doc.options.skip_version_footer {
        return String::new();
    }
    format!(
        "----------------------------------------------\nAutogenerated from chart metadata using helm-docs v{}\n",
        env!("CARGO_PKG_VERSION")
    )
}
