/// Configuration for calltrace.
///
/// Optional `calltrace.toml` in the working directory (or an explicit
/// `--config` path), overridden field-by-field by CLI flags. Mirrors the
/// editor-side settings the analysis used to read: interpreter path, parser
/// script, depth ceiling.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::calltree::DEFAULT_DEPTH_LIMIT;

pub const DEFAULT_CONFIG_FILE: &str = "calltrace.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// Interpreter used to run the external parser script.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Parser script path. No default: dump/script engines refuse to run
    /// without one.
    pub script: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_depth_limit() -> usize {
    DEFAULT_DEPTH_LIMIT
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            interpreter: default_interpreter(),
            script: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            depth_limit: default_depth_limit(),
        }
    }
}

/// Load configuration.
///
/// An explicit path must exist and parse; the implicit `calltrace.toml` is
/// optional and silently skipped when absent.
pub fn load(explicit_path: Option<&str>) -> Result<Config> {
    match explicit_path {
        Some(path) => read_config(Path::new(path)),
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            if implicit.exists() {
                read_config(implicit)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
