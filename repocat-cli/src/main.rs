//! Repocat CLI - Command-line interface for Repocat
//!
//! Analyzes repository checkouts and prints their documentation and commit statistics as JSON

mod report;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use report::JsonReportSink;
use repocat_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success,
    process_concurrently, DocumentType, LoggingConfig, RepocatConfig, RepocatResult,
};
use repocat_repo::{CheckoutManager, ContentConverter, RepositoryAnalyzer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "repocat")]
#[command(about = "Documentation and commit statistics for repository checkouts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze local checkouts
    Analyze {
        /// Checkout directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write the JSON report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of analyses running at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Clone a remote repository and analyze it
    Fetch {
        /// Repository URL
        url: String,

        /// Shallow clone depth
        #[arg(long)]
        depth: Option<u32>,

        /// Write the JSON report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a single document to HTML
    Render {
        /// Document to convert
        file: PathBuf,

        /// Document type (plaintext, markdown, pod); inferred from the extension by default
        #[arg(short = 't', long = "type")]
        doc_type: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        /// Write the default configuration
        #[arg(long)]
        init: bool,

        /// Target file for --init
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Repocat CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Analyze {
            paths,
            output,
            concurrency,
        } => handle_analyze(paths, output, concurrency, &config).await,
        Commands::Fetch { url, depth, output } => handle_fetch(url, depth, output, config).await,
        Commands::Render { file, doc_type } => handle_render(file, doc_type, &config).await,
        Commands::Config { init, path } => handle_config(init, path, &config),
    }
}

fn load_config(config_path: Option<&PathBuf>) -> RepocatResult<RepocatConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return RepocatConfig::from_file(path);
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("repocat").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".repocat").join("config.toml")),
        Some(PathBuf::from("repocat.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return RepocatConfig::from_file(path);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(RepocatConfig::default())
}

async fn handle_analyze(
    paths: Vec<PathBuf>,
    output: Option<PathBuf>,
    concurrency: usize,
    config: &RepocatConfig,
) -> anyhow::Result<()> {
    let total = paths.len();
    log_operation_start!("analyze", checkouts = total, concurrency = concurrency);

    let analyzer = Arc::new(RepositoryAnalyzer::new(config));
    let sink = Arc::new(JsonReportSink::new());

    let results = {
        let sink = Arc::clone(&sink);
        process_concurrently(paths, concurrency, move |path: PathBuf| {
            let analyzer = Arc::clone(&analyzer);
            let sink = Arc::clone(&sink);
            async move {
                let project = path.display().to_string();
                let succeeded = run_analysis(&analyzer, &sink, &path, &project).await;
                RepocatResult::Ok(succeeded)
            }
        })
        .await
    };

    let failed = results
        .into_iter()
        .filter(|result| !matches!(result, Ok(true)))
        .count();

    write_report(&sink, output.as_deref()).await?;

    if failed > 0 {
        log_operation_error!("analyze", format!("{} of {} analyses failed", failed, total));
        bail!("{} of {} analyses failed", failed, total);
    }

    log_operation_success!("analyze", checkouts = total);
    Ok(())
}

/// Analyze one checkout into `sink`, returning whether statistics were produced
async fn run_analysis(
    analyzer: &RepositoryAnalyzer,
    sink: &JsonReportSink,
    path: &Path,
    project: &str,
) -> bool {
    match analyzer.analyze_and_store(path, project, sink).await {
        Ok(outcome) => match &outcome.history {
            Ok(_) => true,
            Err(e) => {
                sink.record_error(project, e);
                false
            }
        },
        Err(e) => {
            e.log();
            sink.record_error(project, &e);
            false
        }
    }
}

async fn handle_fetch(
    url: String,
    depth: Option<u32>,
    output: Option<PathBuf>,
    mut config: RepocatConfig,
) -> anyhow::Result<()> {
    if depth.is_some() {
        config.checkout.clone_depth = depth;
    }

    let checkout = CheckoutManager::new(&config.checkout)
        .checkout(&url)
        .await
        .with_context(|| format!("Failed to check out {}", url))?;

    let analyzer = RepositoryAnalyzer::new(&config);
    let sink = JsonReportSink::new();
    let succeeded = run_analysis(&analyzer, &sink, &checkout, &url).await;

    write_report(&sink, output.as_deref()).await?;

    if !succeeded {
        bail!("Analysis of {} failed", url);
    }
    Ok(())
}

async fn handle_render(
    file: PathBuf,
    doc_type: Option<String>,
    config: &RepocatConfig,
) -> anyhow::Result<()> {
    let doc_type = doc_type
        .map(|name| name.parse::<DocumentType>())
        .transpose()?;

    let html = ContentConverter::new(&config.documents)
        .convert_path(&file, doc_type)
        .await
        .with_context(|| format!("Failed to render {}", file.display()))?;

    println!("{}", html);
    Ok(())
}

fn handle_config(init: bool, path: Option<PathBuf>, config: &RepocatConfig) -> anyhow::Result<()> {
    if !init {
        println!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    let config_path = match path {
        Some(path) => path,
        None => default_config_path().context("Could not determine a configuration directory")?,
    };

    if config_path.exists() {
        warn!("Overwriting existing configuration at {:?}", config_path);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    RepocatConfig::default().save_to_file(&config_path)?;
    println!("✅ Configuration initialized at: {:?}", config_path);
    Ok(())
}

/// Get the default configuration file path
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("repocat").join("config.toml"))
}

async fn write_report(sink: &JsonReportSink, output: Option<&Path>) -> anyhow::Result<()> {
    let json = sink.to_json()?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("📝 Report written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
