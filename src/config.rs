//! Configuration loading
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `pseudo.toml` in the working directory (optional)
//! 3. An explicit config file (`--config` / `PSEUDO_CONFIG_PATH`)
//! 4. `PSEUDO_*` environment variables, e.g. `PSEUDO_RUNTIME__STEPS_PER_TICK=10`
//! 5. Builder overrides (CLI flags)
//!
//! A `.env` file is loaded into the environment first.

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ENTRY: &str = "$main";

const CONFIG_PATH_VAR: &str = "PSEUDO_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Operations executed per scheduler tick
    pub steps_per_tick: usize,
    /// Delay between scheduler ticks
    pub tick_interval_ms: u64,
    /// Function started by `run`
    pub entry: String,
    /// Honor breakpoints
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            steps_per_tick: 50,
            tick_interval_ms: 1,
            entry: DEFAULT_ENTRY.to_string(),
            debug: false,
        }
    }
}

impl RuntimeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Load configuration from files and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.steps_per_tick == 0 {
            return Err(ConfigError::Message(
                "runtime.steps_per_tick must be at least 1".to_string(),
            ));
        }
        if self.runtime.entry.is_empty() {
            return Err(ConfigError::Message(
                "runtime.entry must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder applying explicit overrides on top of the layered sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    steps_per_tick: Option<usize>,
    entry: Option<String>,
    debug: Option<bool>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn steps_per_tick(mut self, steps: Option<usize>) -> Self {
        self.steps_per_tick = steps;
        self
    }

    pub fn entry(mut self, entry: Option<String>) -> Self {
        self.entry = entry;
        self
    }

    pub fn debug(mut self, debug: Option<bool>) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        // Missing .env is fine
        dotenvy::dotenv().ok();

        let config_path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        let mut builder = config::Config::builder()
            .add_source(File::with_name("pseudo").required(false));
        if let Some(path) = &config_path {
            debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path.as_path()));
        }
        builder = builder.add_source(
            Environment::with_prefix("PSEUDO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder.build()?.try_deserialize()?;

        if let Some(steps) = self.steps_per_tick {
            config.runtime.steps_per_tick = steps;
        }
        if let Some(entry) = self.entry {
            config.runtime.entry = entry;
        }
        if let Some(debug) = self.debug {
            config.runtime.debug = debug;
        }

        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}
