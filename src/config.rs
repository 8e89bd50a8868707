//! Configuration loading
//!
//! Settings come from an optional TOML file, then `FACTORY_PLANNER_*`
//! environment variables, then command line flags (applied in `main`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculator::DEFAULT_MAX_DEPTH;

/// Config file picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "factory-planner.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub planner: PlannerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("factory_planner.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub max_depth: usize,
    pub default_tenant: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_tenant: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when neither `-v` nor `RUST_LOG` is set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Load `path` if given, otherwise the default file if it exists, then
    /// apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `FACTORY_PLANNER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("FACTORY_PLANNER_DB") {
            debug!(%path, "database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(depth) = lookup("FACTORY_PLANNER_MAX_DEPTH") {
            self.planner.max_depth = depth
                .parse()
                .with_context(|| format!("FACTORY_PLANNER_MAX_DEPTH is not a number: {depth}"))?;
        }
        if let Some(tenant) = lookup("FACTORY_PLANNER_TENANT") {
            self.planner.default_tenant = tenant
                .parse()
                .with_context(|| format!("FACTORY_PLANNER_TENANT is not a number: {tenant}"))?;
        }
        if let Some(level) = lookup("FACTORY_PLANNER_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }
}
