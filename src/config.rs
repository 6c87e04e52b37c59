//! Configuration management for domainmatch
//!
//! Configuration is loaded from `./config/domainmatch.toml` unless another path
//! is given. All defaults live in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use regex::Regex;

use crate::record::CANDIDATE_COUNT;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/domainmatch.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/domainmatch.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid regex pattern '{pattern_name}': {error}\n  Pattern: {pattern}")]
    InvalidRegex {
        pattern_name: String,
        pattern: String,
        error: String,
    },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
}

/// Column names of the input tables
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub entity_column: String,
    pub name_column: String,
    pub abbreviation_column: String,
    /// Ground-truth website column
    pub url_column: String,
    /// Candidate columns are `{candidate_prefix}1` .. `{candidate_prefix}5`
    pub candidate_prefix: String,
    pub candidate_count: usize,
}

impl InputConfig {
    /// Column name of candidate `slot` (1-based)
    pub fn candidate_column(&self, slot: usize) -> String {
        format!("{}{}", self.candidate_prefix, slot)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            entity_column: "EntityNumber".to_string(),
            name_column: "OfficialName".to_string(),
            abbreviation_column: "Abbreviation".to_string(),
            url_column: "URL".to_string(),
            candidate_prefix: "URL".to_string(),
            candidate_count: CANDIDATE_COUNT,
        }
    }
}

/// Regex patterns
#[derive(Debug, Clone, Deserialize)]
pub struct PatternsConfig {
    /// Extracts the trailing suffix token of a candidate host
    pub suffix_extract: String,
}

/// Record processing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Compute records in parallel
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Worker threads (0 = one per core)
    #[serde(default)]
    pub threads: usize,
}

fn default_parallel() -> bool {
    true
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            threads: 0,
        }
    }
}

/// Output file format for the feature table
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub directory: String,
    /// File stem of the feature table; extension follows `format`
    pub features_file: String,
    pub labels_file: String,
    pub label_map_file: String,
    pub summary_file: String,
    pub predictions_file: String,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("input.entity_column", &self.input.entity_column),
            ("input.name_column", &self.input.name_column),
            ("input.abbreviation_column", &self.input.abbreviation_column),
            ("input.url_column", &self.input.url_column),
            ("input.candidate_prefix", &self.input.candidate_prefix),
            ("output.directory", &self.output.directory),
            ("output.features_file", &self.output.features_file),
            ("output.labels_file", &self.output.labels_file),
            ("output.label_map_file", &self.output.label_map_file),
            ("output.summary_file", &self.output.summary_file),
            ("output.predictions_file", &self.output.predictions_file),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: field.to_string(),
                });
            }
        }

        if self.input.candidate_count != CANDIDATE_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "input.candidate_count".to_string(),
                reason: format!("feature layout is fixed at {} candidates", CANDIDATE_COUNT),
            });
        }

        self.validate_regex("patterns.suffix_extract", &self.patterns.suffix_extract)?;

        Ok(())
    }

    fn validate_regex(&self, name: &str, pattern: &str) -> Result<(), ConfigError> {
        Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
            pattern_name: name.to_string(),
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;
        Ok(())
    }

    /// Compiled suffix extraction pattern
    pub fn suffix_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.patterns.suffix_extract).map_err(|e| ConfigError::InvalidRegex {
            pattern_name: "patterns.suffix_extract".to_string(),
            pattern: self.patterns.suffix_extract.clone(),
            error: e.to_string(),
        })
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
