//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use edumeta_core::{ExtractConfig, ExtractResult, ProgressReporter};
use edumeta_shared::{AppConfig, KnowledgePolicy, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// edumeta — derive learning-environment meta-data from interaction logs.
#[derive(Parser)]
#[command(
    name = "edumeta",
    version,
    about = "Derive learning order, item catalog, and knowledge index documents from interaction datasets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract learning_order.json, items.json, and know_item.json from a dataset.
    Extract {
        /// Source dataset (.npz archive or .json document). Ragged .npz
        /// fields stored as pickled object arrays are not supported;
        /// export them as JSON with one array per trajectory.
        #[arg(long = "npz-path", alias = "npz_path", visible_alias = "source")]
        source: PathBuf,

        /// Directory to write the JSON documents into.
        #[arg(long = "output-dir", alias = "output_dir")]
        output_dir: PathBuf,

        /// Knowledge assignment policy: first-seen, majority, or reject.
        /// Defaults to the config file value.
        #[arg(long)]
        knowledge_policy: Option<KnowledgePolicy>,
    },

    /// Describe the fields of a dataset without extracting anything.
    Inspect {
        /// Source dataset (.npz archive or .json document).
        #[arg(long = "npz-path", alias = "npz_path", visible_alias = "source")]
        source: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "edumeta=info",
        1 => "edumeta=debug",
        _ => "edumeta=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            source,
            output_dir,
            knowledge_policy,
        } => cmd_extract(&source, &output_dir, knowledge_policy),
        Command::Inspect { source } => cmd_inspect(&source),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_extract(
    source: &Path,
    output_dir: &Path,
    knowledge_policy: Option<KnowledgePolicy>,
) -> Result<()> {
    if !source.is_file() {
        return Err(eyre!("dataset '{}' does not exist or is not a file", source.display()));
    }

    let config = load_config()?;
    let extract_config = ExtractConfig {
        source: source.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        fields: config.fields.clone(),
        knowledge_policy: knowledge_policy.unwrap_or(config.extract.knowledge_policy),
    };

    info!(
        source = %source.display(),
        output_dir = %output_dir.display(),
        policy = %extract_config.knowledge_policy,
        "extracting meta-data"
    );

    let reporter = CliProgress::new();
    let result = match edumeta_core::extract_meta(&extract_config, &reporter) {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    let names: Vec<&str> = result.artifacts.iter().map(|a| a.filename.as_str()).collect();

    println!();
    println!("  Wrote {} to {}", names.join(", "), result.output_dir.display());
    println!("  Interactions: {}", result.interaction_count);
    println!("  Items:        {}", result.item_count);
    println!("  Knowledge:    {}", result.knowledge_count);
    for artifact in &result.artifacts {
        println!(
            "  {:<20} {:>9} bytes  sha256:{}",
            artifact.filename,
            artifact.size_bytes,
            &artifact.sha256[..12]
        );
    }
    println!("  Time:         {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_inspect(source: &Path) -> Result<()> {
    let reports = edumeta_dataset::inspect(source)?;

    if reports.is_empty() {
        println!("no fields found in {}", source.display());
        return Ok(());
    }

    let width = reports.iter().map(|r| r.name.len()).max().unwrap_or(0);
    println!();
    for report in &reports {
        match &report.stats {
            Ok(stats) => println!(
                "  {:<width$}  {:>10} values  {:<8}  {}",
                report.name,
                stats.flat_len,
                if stats.integral { "integral" } else { "float" },
                stats.layout,
            ),
            Err(e) => println!("  {:<width$}  unreadable: {e}", report.name),
        }
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &ExtractResult) {
        self.spinner.finish_and_clear();
    }
}
