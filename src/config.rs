//! Parser and conversion configuration
//!
//! Configuration is plain data injected into [`StreamParser`] and
//! [`DefaultConversionService`]; nothing here is global. It can be persisted
//! as pretty-printed JSON.
//!
//! [`StreamParser`]: crate::stream::StreamParser
//! [`DefaultConversionService`]: crate::tuple::DefaultConversionService

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default strftime pattern for string <-> date conversion.
pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stream definition parser settings
    pub parser: ParserConfig,

    /// Default conversion service settings
    pub conversion: ConversionConfig,
}

/// What to do when a module repeats an option key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateOptionPolicy {
    /// Fail with a duplicate-option parse error
    #[default]
    Reject,
    /// Keep the last value
    LastWins,
}

/// Stream parser settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Handling of repeated option keys within one module
    pub duplicate_options: DuplicateOptionPolicy,

    /// Accept `--key=` with an empty value
    pub allow_empty_values: bool,
}

/// Default conversion service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// strftime pattern used to render and parse dates
    pub date_pattern: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
        }
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> Result<Config> {
    let data = fs::read(path).with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: Config =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;
    Ok(config)
}

/// Write configuration to a JSON file
pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("streamdef.json");

        let config = Config {
            parser: ParserConfig {
                duplicate_options: DuplicateOptionPolicy::LastWins,
                allow_empty_values: true,
            },
            conversion: ConversionConfig {
                date_pattern: "%d/%m/%Y".to_string(),
            },
        };

        write_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.json");
        fs::write(&path, br#"{"parser": {"duplicate_options": "last-wins"}}"#).unwrap();

        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.parser.duplicate_options, DuplicateOptionPolicy::LastWins);
        assert!(!loaded.parser.allow_empty_values);
        assert_eq!(loaded.conversion.date_pattern, DEFAULT_DATE_PATTERN);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(load_config(&temp.path().join("absent.json")).is_err());
    }
}
