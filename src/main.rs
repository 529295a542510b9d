//! helm-docs: generate README documentation for Helm charts from the
//! comments in their values files.
//!
//! Every chart found under the search root gets a README next to its
//! `Chart.yaml`: `helm-docs -c charts/ -u`

use anyhow::{Context, Result};
use clap::Parser;
use helm_docs::chart::Chart;
use helm_docs::discover::{self, IgnoreRules};
use helm_docs::parser::annotation::AnnotationParser;
use helm_docs::render::template::TemplateRenderer;
use helm_docs::render::{self, ChartDocument, Format, RenderOptions, Renderer};
use helm_docs::{Generator, Pipeline, SortOrder};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "helm-docs",
    version,
    about = "Generate documentation for Helm charts from annotated values files"
)]
struct Cli {
    /// Directory to search recursively for charts
    #[arg(short = 'c', long, env = "HELM_DOCS_CHART_SEARCH_ROOT", default_value = ".")]
    chart_search_root: PathBuf,

    /// Only document these chart directories (relative to the search root).
    /// Can be specified multiple times.
    #[arg(short = 'g', long, env = "HELM_DOCS_CHART_TO_GENERATE", value_delimiter = ',')]
    chart_to_generate: Vec<PathBuf>,

    /// Ignore file at the search root listing paths to skip
    #[arg(short = 'i', long, env = "HELM_DOCS_IGNORE_FILE", default_value = ".helmdocsignore")]
    ignore_file: PathBuf,

    /// Output file name, written in each chart directory.
    /// Defaults to README.md, or README.json with `--format json`.
    #[arg(short = 'o', long, env = "HELM_DOCS_OUTPUT_FILE")]
    output_file: Option<String>,

    /// Values file name within each chart directory
    #[arg(short = 'f', long, env = "HELM_DOCS_VALUES_FILE", default_value = "values.yaml")]
    values_file: String,

    /// Tera template files (glob patterns, relative to each chart directory).
    /// The first match is rendered; the built-in layout is used if none match.
    #[arg(
        short = 't',
        long,
        env = "HELM_DOCS_TEMPLATE_FILES",
        value_delimiter = ',',
        default_value = "README.md.tera"
    )]
    template_files: Vec<String>,

    /// Order of values in the generated tables
    #[arg(short = 's', long, env = "HELM_DOCS_SORT_VALUES_ORDER", value_enum, default_value_t = SortOrder::AlphaNumeric)]
    sort_values_order: SortOrder,

    /// Document the values of local subcharts under their mount key
    #[arg(short = 'u', long, env = "HELM_DOCS_DOCUMENT_DEPENDENCY_VALUES")]
    document_dependency_values: bool,

    /// Leave values without a description out of the output
    #[arg(long, env = "HELM_DOCS_IGNORE_NON_DESCRIPTIONS")]
    ignore_non_descriptions: bool,

    /// Omit the "Autogenerated" footer
    #[arg(long, env = "HELM_DOCS_SKIP_VERSION_FOOTER")]
    skip_version_footer: bool,

    /// shields.io badge style
    #[arg(long, env = "HELM_DOCS_BADGE_STYLE", default_value = "flat-square")]
    badge_style: String,

    /// Output format: markdown (default) or json
    #[arg(long, env = "HELM_DOCS_FORMAT", value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Print the generated documents instead of writing them
    #[arg(short = 'd', long, env = "HELM_DOCS_DRY_RUN")]
    dry_run: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(short = 'l', long, env = "HELM_DOCS_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid --log-level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let failed = run(&cli)?;
    if failed > 0 {
        anyhow::bail!("failed to generate documentation for {} chart(s)", failed);
    }
    Ok(())
}

/// Document every selected chart. Returns the number of charts that failed.
fn run(cli: &Cli) -> Result<usize> {
    let root = &cli.chart_search_root;
    let targets = chart_dirs(cli)?;
    info!(charts = targets.len(), root = %root.display(), "found charts");

    let mut failed = 0;
    let mut charts: BTreeMap<String, Chart> = BTreeMap::new();
    let mut documented: Vec<String> = Vec::new();
    for dir in &targets {
        match Chart::load(dir, &cli.values_file) {
            Ok(chart) => {
                documented.push(chart.id());
                charts.insert(chart.id(), chart);
            }
            Err(e) => {
                warn!("skipping {}: {}", dir.display(), e);
                failed += 1;
            }
        }
    }
    if cli.document_dependency_values {
        load_dependencies(&mut charts, &cli.values_file);
    }

    let pipeline = Pipeline {
        parser: AnnotationParser::default(),
        sort_order: cli.sort_values_order,
    };
    let mut generator = Generator::new(pipeline);
    for chart in charts.values() {
        generator.add(chart.package(cli.document_dependency_values));
    }

    let options = RenderOptions {
        ignore_non_descriptions: cli.ignore_non_descriptions,
        skip_version_footer: cli.skip_version_footer,
        badge_style: cli.badge_style.clone(),
    };

    for id in &documented {
        let chart = &charts[id];
        let result = generator
            .generate(id)
            .map_err(anyhow::Error::from)
            .and_then(|model| document(cli, chart, &model, &options));
        if let Err(e) = result {
            error!("{}: {:#}", chart.dir.display(), e);
            failed += 1;
        }
    }

    Ok(failed)
}

/// Chart directories to document, from `--chart-to-generate` or discovery.
fn chart_dirs(cli: &Cli) -> Result<Vec<PathBuf>> {
    let root = &cli.chart_search_root;
    if !cli.chart_to_generate.is_empty() {
        return Ok(cli.chart_to_generate.iter().map(|p| root.join(p)).collect());
    }
    let rules = IgnoreRules::from_file(&root.join(&cli.ignore_file))
        .with_context(|| format!("failed to read ignore file {}", cli.ignore_file.display()))?;
    discover::find_charts(root, &rules)
        .with_context(|| format!("failed to search {} for charts", root.display()))
}

/// Load local subcharts reachable from the loaded charts.
fn load_dependencies(charts: &mut BTreeMap<String, Chart>, values_file: &str) {
    let mut pending: Vec<PathBuf> = charts
        .values()
        .flat_map(|chart| {
            chart
                .meta
                .dependencies
                .iter()
                .filter_map(|dep| chart.local_dependency(dep))
                .collect::<Vec<_>>()
        })
        .collect();

    while let Some(dir) = pending.pop() {
        if charts.contains_key(&dir.display().to_string()) {
            continue;
        }
        match Chart::load(&dir, values_file) {
            Ok(chart) => {
                pending.extend(
                    chart
                        .meta
                        .dependencies
                        .iter()
                        .filter_map(|dep| chart.local_dependency(dep)),
                );
                charts.insert(chart.id(), chart);
            }
            Err(e) => warn!("failed to load dependency {}: {}", dir.display(), e),
        }
    }
}

/// Render one chart's model and write (or print) it.
fn document(
    cli: &Cli,
    chart: &Chart,
    model: &helm_docs::DocumentModel,
    options: &RenderOptions,
) -> Result<()> {
    let template = match cli.format {
        Format::Markdown => TemplateRenderer::load(&chart.dir, &cli.template_files)?,
        Format::Json => None,
    };
    let renderer: Box<dyn Renderer> = match template {
        Some(template) => Box::new(template),
        None => render::create_renderer(cli.format),
    };

    let output = renderer.render(&ChartDocument::new(&chart.meta, model, options))?;
    if cli.dry_run {
        print!("{}", output);
        return Ok(());
    }

    let out_path = output_path(&chart.dir, cli.output_file.as_deref(), renderer.file_extension());
    fs::write(&out_path, &output)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    info!(chart = %chart.meta.name, path = %out_path.display(), "generated documentation");
    Ok(())
}

fn output_path(chart_dir: &Path, output_file: Option<&str>, extension: &str) -> PathBuf {
    match output_file {
        Some(name) => chart_dir.join(name),
        None => chart_dir.join(format!("README.{}", extension)),
    }
}
