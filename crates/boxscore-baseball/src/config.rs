// Configuration loading and validation (config/engine.toml).

use crate::constants::{load_linear_weights, LinearWeightsTable, DEFAULT_FALLBACK_WINDOW};
use crate::loaders::LoadError;
use crate::metrics::percentile::{PercentileConfig, DEFAULT_BUCKETS, MAX_BUCKETS};
use crate::model::{Metric, UnknownMetric};
use crate::population::PopulationFilter;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The stock engine.toml, written to `config/` when no copy exists yet.
pub const DEFAULT_ENGINE_TOML: &str = include_str!("../defaults/engine.toml");

const ENGINE_FILE: &str = "engine.toml";

/// Qualification thresholds the season leaderboards rank with.
pub const DEFAULT_MIN_PA: u32 = 20;
pub const DEFAULT_MIN_IP: f64 = 10.0;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("invalid metric in `{field}`: {source}")]
    UnknownMetric {
        field: String,
        source: UnknownMetric,
    },
}

// ---------------------------------------------------------------------------
// Assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub percentiles: PercentileConfig,
    pub constants: ConstantsConfig,
    pub population: PopulationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConstantsConfig {
    /// Linear-weights CSV. Relative paths resolve against the base directory;
    /// `None` selects the bundled table.
    pub path: Option<PathBuf>,
    pub fallback_window: usize,
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self {
            path: None,
            fallback_window: DEFAULT_FALLBACK_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub min_pa: u32,
    pub min_ip: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            min_pa: DEFAULT_MIN_PA,
            min_ip: DEFAULT_MIN_IP,
        }
    }
}

impl EngineConfig {
    /// Linear-weights table named by `[constants]`, or the bundled one.
    pub fn constants_table(&self, base_dir: &Path) -> Result<LinearWeightsTable, LoadError> {
        let window = self.constants.fallback_window;
        match &self.constants.path {
            Some(path) if path.is_absolute() => load_linear_weights(path, window),
            Some(path) => load_linear_weights(&base_dir.join(path), window),
            None => LinearWeightsTable::bundled(window),
        }
    }

    /// Population filter seeded with the configured thresholds. Callers add
    /// school, position, and class-year restrictions on top.
    pub fn population_filter(&self) -> PopulationFilter {
        PopulationFilter {
            min_pa: self.population.min_pa,
            min_ip: self.population.min_ip,
            ..PopulationFilter::default()
        }
    }
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for engine.toml. Metric names stay strings
/// here so an unknown name can be reported with its field.
#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    percentiles: PercentilesSection,
    #[serde(default)]
    constants: ConstantsConfig,
    #[serde(default)]
    population: PopulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct PercentilesSection {
    #[serde(default = "default_buckets")]
    buckets: usize,
    inverted: Vec<String>,
}

fn default_buckets() -> usize {
    DEFAULT_BUCKETS
}

fn parse_metrics(field: &str, names: &[String]) -> Result<BTreeSet<Metric>, ConfigError> {
    names
        .iter()
        .map(|name| {
            name.parse::<Metric>().map_err(|source| ConfigError::UnknownMetric {
                field: field.to_string(),
                source,
            })
        })
        .collect()
}

/// Parse and validate engine.toml text. `path` is only used in errors.
pub fn parse_config(text: &str, path: &Path) -> Result<EngineConfig, ConfigError> {
    let file: EngineFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = EngineConfig {
        percentiles: PercentileConfig {
            buckets: file.percentiles.buckets,
            inverted: parse_metrics("percentiles.inverted", &file.percentiles.inverted)?,
        },
        constants: file.constants,
        population: file.population,
    };

    validate(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load `config/engine.toml` under `base_dir` without materialising defaults.
pub fn load_config_from(base_dir: &Path) -> Result<EngineConfig, ConfigError> {
    let path = base_dir.join("config").join(ENGINE_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Write the embedded default engine.toml into `base_dir/config/` unless a
/// copy already exists. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let target = config_dir.join(ENGINE_FILE);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, DEFAULT_ENGINE_TOML.as_bytes()).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(vec![target])
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(vec![]),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures the default config file is written before loading.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let buckets = config.percentiles.buckets;
    if !(2..=MAX_BUCKETS).contains(&buckets) {
        return Err(ConfigError::ValidationError {
            field: "percentiles.buckets".into(),
            message: format!("must be between 2 and {MAX_BUCKETS}, got {buckets}"),
        });
    }

    if config.constants.fallback_window == 0 {
        return Err(ConfigError::ValidationError {
            field: "constants.fallback_window".into(),
            message: "must be > 0".into(),
        });
    }

    let min_ip = config.population.min_ip;
    if !min_ip.is_finite() || min_ip < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "population.min_ip".into(),
            message: format!("must be a non-negative number, got {min_ip}"),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
