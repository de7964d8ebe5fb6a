//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.routegrid.toml` files.

use crate::cli::{Command, FetchArgs, OutputFormat, ParseArgs};
use crate::models::ValueMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".routegrid.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Table building settings.
    #[serde(default)]
    pub parse: ParseConfig,

    /// Export capture settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Settings for turning exports into a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Glob pattern for input files.
    #[serde(default = "default_input")]
    pub input: String,

    /// Output file path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Numeric rendering of cells.
    #[serde(default)]
    pub mode: ValueMode,

    /// Output file format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Name of the identifier column.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Exit with code 2 when any document was skipped.
    #[serde(default)]
    pub fail_on_skip: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            mode: ValueMode::default(),
            format: OutputFormat::default(),
            id_column: default_id_column(),
            fail_on_skip: false,
        }
    }
}

fn default_input() -> String {
    "*.json".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("routes_by_month.csv")
}

fn default_id_column() -> String {
    "Route".to_string()
}

/// Settings for capturing raw exports from the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Query endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Value of the `X-PowerBI-ResourceKey` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_key: Option<String>,

    /// Value of the `Origin` header.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Pause between consecutive requests, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            resource_key: None,
            origin: default_origin(),
            delay_ms: default_delay_ms(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://wabi-us-east-a-primary-api.analysis.windows.net/public/reports/querydata".to_string()
}

fn default_origin() -> String {
    "https://app.powerbi.com".to_string()
}

fn default_delay_ms() -> u64 {
    500
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only
    /// values the user actually passed override the file.
    pub fn merge_with_args(&mut self, command: &Command) {
        match command {
            Command::Parse(args) => self.merge_parse(args),
            Command::Fetch(args) => self.merge_fetch(args),
        }
    }

    fn merge_parse(&mut self, args: &ParseArgs) {
        if let Some(ref input) = args.input {
            self.parse.input = input.clone();
        }
        if let Some(ref output) = args.output {
            self.parse.output = output.clone();
        }
        if let Some(format) = args.format {
            self.parse.format = format;
        }
        if let Some(ref id_column) = args.id_column {
            self.parse.id_column = id_column.clone();
        }

        // Flags always override
        if args.as_percent {
            self.parse.mode = ValueMode::Percent;
        }
        if args.fail_on_skip {
            self.parse.fail_on_skip = true;
        }
    }

    fn merge_fetch(&mut self, args: &FetchArgs) {
        if let Some(ref endpoint) = args.endpoint {
            self.fetch.endpoint = endpoint.clone();
        }
        if let Some(ref key) = args.resource_key {
            self.fetch.resource_key = Some(key.clone());
        }
        if let Some(delay) = args.delay_ms {
            self.fetch.delay_ms = delay;
        }
        if let Some(timeout) = args.timeout {
            self.fetch.timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args() -> ParseArgs {
        ParseArgs {
            input: None,
            output: None,
            as_percent: false,
            format: None,
            id_column: None,
            dry_run: false,
            fail_on_skip: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.parse.input, "*.json");
        assert_eq!(config.parse.output, PathBuf::from("routes_by_month.csv"));
        assert_eq!(config.parse.mode, ValueMode::Proportion);
        assert_eq!(config.parse.id_column, "Route");
        assert_eq!(config.fetch.delay_ms, 500);
        assert!(config.fetch.resource_key.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[parse]
input = "exports/*.json"
mode = "percent"
format = "json"

[fetch]
resource_key = "abc"
delay_ms = 1000
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.parse.input, "exports/*.json");
        assert_eq!(config.parse.mode, ValueMode::Percent);
        assert_eq!(config.parse.format, OutputFormat::Json);
        assert_eq!(config.parse.id_column, "Route");
        assert_eq!(config.fetch.resource_key.as_deref(), Some("abc"));
        assert_eq!(config.fetch.delay_ms, 1000);
        assert_eq!(config.fetch.timeout_seconds, 60);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str("[parse]\ninput = \"a/*.json\"\nid_column = \"Line\"").unwrap();

        let mut args = parse_args();
        args.input = Some("b/*.json".to_string());
        args.as_percent = true;
        config.merge_with_args(&Command::Parse(args));

        assert_eq!(config.parse.input, "b/*.json");
        assert_eq!(config.parse.id_column, "Line");
        assert_eq!(config.parse.mode, ValueMode::Percent);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[parse]"));
        assert!(toml_str.contains("[fetch]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.parse.input, "*.json");
    }
}
