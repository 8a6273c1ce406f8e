use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::catalog::BuiltinCatalog;
use crate::config::Config;
use crate::elements::ElementError;
use crate::executor::StatementExecutor;
use crate::function::{Function, FunctionDefinition};
use crate::types::{json_to_value, Value};

#[derive(Parser)]
#[command(name = "treeline")]
#[command(about = "Treeline - run and check element-tree functions", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "treeline_core=debug" (RUST_LOG still wins)
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a function definition and print its result
    Run {
        /// Path to a function definition (JSON)
        file: PathBuf,

        /// Parameter value as JSON, once per argument in call order
        #[arg(long = "arg")]
        args: Vec<String>,
    },

    /// Report validation findings for a function definition
    Check {
        /// Path to a function definition (JSON)
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load config before anything else so config errors show up first
    let config = Config::builder()
        .config_path(cli.config)
        .log_filter(cli.log)
        .build()?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Run { file, args } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, cancelling");
                    on_interrupt.cancel();
                }
            });

            let mut ctx = StatementExecutor::from_config(&config.execution).echo(true);
            match run_file(&file, &args, &config, &mut ctx, &cancel).await? {
                Some(value) => println!("=> {}", value),
                None => println!("=> (no value)"),
            }
        }

        Commands::Check { file } => {
            let findings = check_file(&file)?;
            if findings.is_empty() {
                println!("✓ No problems found");
                return Ok(());
            }
            for finding in &findings {
                println!("{}", finding);
            }
            let errors = findings.iter().filter(|f| f.is_error()).count();
            if errors > 0 {
                bail!("{} error(s) found in {}", errors, file.display());
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    // Ignore a subscriber installed by an embedding host
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_function(path: &Path, config: &Config) -> Result<Function> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let definition = FunctionDefinition::from_json(&text)
        .with_context(|| format!("Invalid function definition in {}", path.display()))?;
    let function = Function::from_definition(definition, &BuiltinCatalog::new())
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(function.with_history_limit(config.history.max_entries))
}

fn parse_params(raw: &[String]) -> Result<Vec<Value>> {
    raw.iter()
        .map(|arg| {
            let json: serde_json::Value = serde_json::from_str(arg)
                .with_context(|| format!("Argument is not valid JSON: {}", arg))?;
            json_to_value(&json).with_context(|| format!("Unsupported argument value: {}", arg))
        })
        .collect()
}

async fn run_file(
    path: &Path,
    raw_args: &[String],
    config: &Config,
    ctx: &mut StatementExecutor,
    cancel: &CancellationToken,
) -> Result<Option<Value>> {
    let mut function = load_function(path, config)?;
    let params = parse_params(raw_args)?;
    debug!(function = function.name(), params = params.len(), "running");

    function
        .execute(params, ctx, cancel)
        .await
        .with_context(|| format!("Function '{}' failed", function.name()))
}

fn check_file(path: &Path) -> Result<Vec<ElementError>> {
    let function = load_function(path, &Config::default())?;
    Ok(function.check_for_errors())
}
