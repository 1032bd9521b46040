//! lexbridge CLI - move lexical-resource graphs between SQLite and XML

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use lexbridge::config;
use lexbridge::decode::ResolutionMode;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lexbridge")]
#[command(version)]
#[command(about = "Role-driven round trips for lexical-resource graphs across SQLite and XML")]
#[command(long_about = r#"
lexbridge stores unified lexical resources (lexicons, entries, senses,
synsets, frames) as SQLite databases or XML documents and converts
between the two without per-type mapping code.

Example usage:
  lexbridge sample --output sample.db
  lexbridge convert --input sample.db --output sample.xml --resolution strict
  lexbridge check --input sample.xml --resolution lenient
  lexbridge schema --format layout
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (default: ./lexbridge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaFormat {
    /// SQLite DDL
    Sql,
    /// XML element layout
    Layout,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the storage schema of the built-in lexical model
    Schema {
        #[arg(short, long, value_enum, default_value_t = SchemaFormat::Sql)]
        format: SchemaFormat,
    },

    /// Decode a store and write it into another (`.xml` selects XML, anything else SQLite)
    Convert {
        /// Store to read
        #[arg(short, long)]
        input: PathBuf,

        /// Store to create (default: [target] from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// How to treat references whose target is missing
        #[arg(short, long)]
        resolution: Option<ResolutionMode>,

        /// Records per SQLite transaction
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Replace the output if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Decode a store and report references that do not resolve
    Check {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        resolution: Option<ResolutionMode>,
    },

    /// Count stored nodes per entity type
    Stats {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write a small demonstration resource
    Sample {
        /// Store to create (default: [target] from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace the output if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Write a default lexbridge.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// JSON envelope for a successful command
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    lexbridge::ui::json(&serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    }))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        return commands::run_init(output_mode, &path, force);
    }

    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("config file {} does not exist", path.display());
        }
    }
    let cfg = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Schema { format } => commands::run_schema(output_mode, format),
        Commands::Convert {
            input,
            output,
            resolution,
            batch_size,
            force,
        } => commands::run_convert(output_mode, &cfg, &input, output, resolution, batch_size, force),
        Commands::Check { input, resolution } => commands::run_check(output_mode, &cfg, &input, resolution),
        Commands::Stats { input } => commands::run_stats(output_mode, &input),
        Commands::Sample { output, force } => commands::run_sample(output_mode, &cfg, output, force),
        Commands::Init { .. } => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode) {
        match output_mode {
            OutputMode::Human => lexbridge::ui::error(&format!("{:#}", err)),
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({ "ok": false, "error": format!("{:#}", err) })
            ),
        }
        std::process::exit(1);
    }
}
