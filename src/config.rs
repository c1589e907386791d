//! Layered configuration with source tracking.
//!
//! Values resolve in precedence order, lowest first:
//!
//! 1. Built-in defaults
//! 2. Project config file (`statesel.json` in the working directory, or the
//!    file named by `--config`)
//! 3. Environment variables (`STATESEL_*`)
//! 4. CLI flags
//!
//! Every resolved value remembers which layer it came from.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use statesel_core::node::{RegistryError, TypeRegistry};
use thiserror::Error;

/// Default project config file name.
pub const CONFIG_FILE: &str = "statesel.json";

/// Environment variable naming a type registry file.
pub const ENV_TYPES: &str = "STATESEL_TYPES";
/// Environment variable overriding the batch size.
pub const ENV_BATCH_SIZE: &str = "STATESEL_BATCH_SIZE";
/// Environment variable overriding the shuffle seed.
pub const ENV_SEED: &str = "STATESEL_SEED";
/// Environment variable overriding the GloVe vector width.
pub const ENV_GLOVE_DIM: &str = "STATESEL_GLOVE_DIM";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "STATESEL_LOG_LEVEL";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config '{path}': {message}")]
    Io { path: String, message: String },

    /// Config file is not valid.
    #[error("invalid config '{path}': {message}")]
    Parse { path: String, message: String },

    /// Environment variable holds an unusable value.
    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: String, value: String },

    /// A size setting resolved to zero.
    #[error("{name} must be at least 1 (set by {origin:?})")]
    ZeroSize { name: String, origin: ConfigSource },

    /// Unknown log level name.
    #[error("invalid log level '{value}' (expected one of: trace, debug, info, warn, error)")]
    InvalidLogLevel { value: String },
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From the project config file.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }

    fn layer(self, value: Option<T>, source: ConfigSource) -> Self {
        match value {
            Some(value) => self.merge(ConfigValue::new(value, source)),
            None => self,
        }
    }
}

// ============================================================================
// Layers
// ============================================================================

/// Contents of a project config file. All fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    types: Option<PathBuf>,
    batch_size: Option<usize>,
    shuffle_seed: Option<u64>,
    glove_dim: Option<usize>,
    log_level: Option<String>,
}

/// One partially-specified layer above the defaults.
#[derive(Debug, Default, Clone, PartialEq)]
struct Layer {
    types: Option<PathBuf>,
    batch_size: Option<usize>,
    shuffle_seed: Option<u64>,
    glove_dim: Option<usize>,
    log_level: Option<String>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CliOverrides {
    /// Explicit config file; when set it must exist.
    pub config: Option<PathBuf>,
    pub types: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub shuffle_seed: Option<u64>,
    pub glove_dim: Option<usize>,
    pub log_level: Option<String>,
}

fn load_file_layer(cwd: &Path, explicit: Option<&Path>) -> Result<Layer, ConfigError> {
    let path = match explicit {
        Some(path) => cwd.join(path),
        None => {
            let default = cwd.join(CONFIG_FILE);
            if !default.exists() {
                return Ok(Layer::default());
            }
            default
        }
    };

    let shown = path.display().to_string();
    let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
        path: shown.clone(),
        message: e.to_string(),
    })?;
    let file: FileConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: shown.clone(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %shown, "loaded project config");

    // Relative registry paths are relative to the config file.
    let base = path.parent().unwrap_or(cwd);
    Ok(Layer {
        types: file.types.map(|t| base.join(t)),
        batch_size: file.batch_size,
        shuffle_seed: file.shuffle_seed,
        glove_dim: file.glove_dim,
        log_level: file.log_level,
    })
}

fn env_layer<F>(cwd: &Path, env: F) -> Result<Layer, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    fn parse_num<T: std::str::FromStr>(var: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
        match value {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnv {
                    var: var.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }

    Ok(Layer {
        types: env(ENV_TYPES).filter(|v| !v.is_empty()).map(|v| cwd.join(v)),
        batch_size: parse_num(ENV_BATCH_SIZE, env(ENV_BATCH_SIZE))?,
        shuffle_seed: parse_num(ENV_SEED, env(ENV_SEED))?,
        glove_dim: parse_num(ENV_GLOVE_DIM, env(ENV_GLOVE_DIM))?,
        log_level: env(ENV_LOG_LEVEL).filter(|v| !v.is_empty()),
    })
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// Extra type registry file, merged over the built-in types.
    pub types_file: ConfigValue<Option<PathBuf>>,
    pub batch_size: ConfigValue<usize>,
    pub shuffle_seed: ConfigValue<u64>,
    pub glove_dim: ConfigValue<usize>,
    pub log_level: ConfigValue<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            types_file: ConfigValue::new(None, ConfigSource::Default),
            batch_size: ConfigValue::new(64, ConfigSource::Default),
            shuffle_seed: ConfigValue::new(1, ConfigSource::Default),
            glove_dim: ConfigValue::new(300, ConfigSource::Default),
            log_level: ConfigValue::new("warn".to_string(), ConfigSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Resolve against the process environment.
    pub fn resolve(cwd: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(cwd, cli, |var| std::env::var(var).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with_env<F>(cwd: &Path, cli: &CliOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cli_layer = Layer {
            types: cli.types.as_ref().map(|t| cwd.join(t)),
            batch_size: cli.batch_size,
            shuffle_seed: cli.shuffle_seed,
            glove_dim: cli.glove_dim,
            log_level: cli.log_level.clone(),
        };
        let layers = [
            (load_file_layer(cwd, cli.config.as_deref())?, ConfigSource::ProjectConfig),
            (env_layer(cwd, env)?, ConfigSource::EnvVar),
            (cli_layer, ConfigSource::CliFlag),
        ];

        let mut config = ResolvedConfig::default();
        for (layer, source) in layers {
            config.types_file = config.types_file.layer(layer.types.map(Some), source);
            config.batch_size = config.batch_size.layer(layer.batch_size, source);
            config.shuffle_seed = config.shuffle_seed.layer(layer.shuffle_seed, source);
            config.glove_dim = config.glove_dim.layer(layer.glove_dim, source);
            config.log_level = config.log_level.layer(layer.log_level, source);
        }

        for (name, value) in [
            ("batch_size", &config.batch_size),
            ("glove_dim", &config.glove_dim),
        ] {
            if value.value == 0 {
                return Err(ConfigError::ZeroSize {
                    name: name.to_string(),
                    origin: value.source,
                });
            }
        }

        let level = config.log_level.value.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel {
                value: config.log_level.value,
            });
        }
        config.log_level.value = level;
        Ok(config)
    }

    /// Built-in types extended with the configured registry file.
    pub fn registry(&self) -> Result<TypeRegistry, RegistryError> {
        let mut registry = TypeRegistry::with_builtins();
        if let Some(path) = &self.types_file.value {
            registry.extend_from_file(path)?;
            tracing::debug!(path = %path.display(), types = registry.len(), "extended type registry");
        }
        Ok(registry)
    }
}
