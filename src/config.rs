//! Configuration
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. A TOML file: `treeline.toml` in the working directory if present, or
//!    the path given via the builder / `TREELINE_CONFIG_PATH` (must exist)
//! 3. Environment variables `TREELINE__<SECTION>__<KEY>`, e.g.
//!    `TREELINE__HISTORY__MAX_ENTRIES=50` (a `.env` file is loaded first)
//! 4. Explicit overrides from the builder

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TREELINE_CONFIG_PATH";

const ENV_PREFIX: &str = "TREELINE";
const DEFAULT_FILE: &str = "treeline";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Snapshots kept per function, including the baseline
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Yield to the scheduler between loop iterations
    pub yield_in_loops: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            yield_in_loops: true,
        }
    }
}

impl Config {
    /// Load configuration from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.history.max_entries >= 1,
            "history.max_entries must be at least 1"
        );
        ensure!(
            !self.logging.filter.trim().is_empty(),
            "logging.filter must not be empty"
        );
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

/// Builder for [`Config`] with explicit overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    /// Explicit config file (overrides `TREELINE_CONFIG_PATH` and the default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override `logging.filter`
    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let mut builder = ::config::Config::builder()
            .set_default("logging.filter", defaults.logging.filter.clone())?
            .set_default("history.max_entries", defaults.history.max_entries as i64)?
            .set_default("execution.yield_in_loops", defaults.execution.yield_in_loops)?;

        let path = self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        builder = match path {
            Some(path) => {
                ensure!(path.exists(), "Config file not found: {}", path.display());
                builder.add_source(::config::File::from(path.as_path()).required(true))
            }
            None => builder.add_source(::config::File::with_name(DEFAULT_FILE).required(false)),
        };

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(filter) = self.log_filter {
            builder = builder.set_override("logging.filter", filter)?;
        }

        let config: Config = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }
}
