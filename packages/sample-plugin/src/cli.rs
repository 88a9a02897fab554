//! Command-line interface for the sample plugin.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;

use statetree_reader::{
    FailurePolicy, ReadOrchestrator, ReadReport, ReaderConfig, ReaderRegistry,
    ReaderRegistryBuilder, SchemaPath,
};

use crate::data::{load_elements, seed_service};
use crate::error::Result;
use crate::factory::{root_path, ModuleStateReaderFactory};

/// Statetree sample - Assemble and dump the sample plugin state tree.
#[derive(Parser)]
#[command(name = "statetree-sample")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a subtree and print it.
    Read {
        /// Path to read (default: /sample-plugin-state)
        #[arg(short, long)]
        path: Option<String>,

        /// YAML file with the seed elements (default: empty backend)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Substitute empty values for failed branches instead of failing
        #[arg(long)]
        best_effort: bool,

        /// Per-call backend timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List the registered reader paths in read order.
    Paths,
}

/// Output format of the dumped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Read {
            path,
            data,
            format,
            best_effort,
            timeout_ms,
        } => {
            let mut config = ReaderConfig::from_env()?;
            if best_effort {
                config = config.with_failure_policy(FailurePolicy::BestEffort);
            }
            if let Some(ms) = timeout_ms {
                config = config.with_call_timeout(Duration::from_millis(ms));
            }
            read_command(path.as_deref(), data.as_deref(), format, config)
        }
        Commands::Paths => paths_command(),
    }
}

/// Build the plugin registry over a backend seeded from `data`.
///
/// # Errors
///
/// Fails if the seed data cannot be loaded or registration fails.
pub fn build_registry(data: Option<&Path>) -> Result<ReaderRegistry> {
    let elements = match data {
        Some(path) => load_elements(path)?,
        None => Vec::new(),
    };
    let service = Arc::new(seed_service(&elements));

    let mut builder = ReaderRegistryBuilder::new();
    builder.add_factory(&ModuleStateReaderFactory::new(service))?;
    Ok(builder.build()?)
}

/// Serialize a read result in the requested format.
///
/// # Errors
///
/// Fails if serialization fails.
pub fn render(report: &ReadReport, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(&report.record)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&report.record)?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}

/// Execute the read command.
fn read_command(
    path: Option<&str>,
    data: Option<&Path>,
    format: OutputFormat,
    config: ReaderConfig,
) -> Result<()> {
    let path = match path {
        Some(text) => text.parse::<SchemaPath>()?,
        None => root_path(),
    };
    let registry = build_registry(data)?;
    let reader = ReadOrchestrator::new(Arc::new(registry), config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(reader.read_subtree_with_report(&path))?;

    for failure in &report.failures {
        eprintln!("{} {}", style("Skipped:").yellow().bold(), failure);
    }
    for dropped in &report.dropped {
        eprintln!("{} {} (vanished)", style("Dropped:").yellow(), dropped);
    }

    let rendered = render(&report, format)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Execute the paths command.
fn paths_command() -> Result<()> {
    let registry = build_registry(None)?;
    for path in registry.paths() {
        let kind = match registry.get(path) {
            Some(reader) if reader.is_structural() => "container",
            _ => "list",
        };
        println!("{path} {}", style(kind).dim());
    }
    Ok(())
}
