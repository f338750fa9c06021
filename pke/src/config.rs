use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::SearchResult;
use crate::filters::ExtensionFilter;
use crate::search::request::SearchRequest;

/// Default number of whitespace-delimited tokens in a snippet window
pub const DEFAULT_SNIPPET_WIDTH: usize = 11;

/// How to handle file content that is not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Treat invalid UTF-8 as a decode error; the file yields no hits
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep scanning
    Lossy,
}

/// Configuration for a key search.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.pke.yaml` in the current directory
/// 3. Global `$HOME/.config/pke/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Literal, case-sensitive text to look for
/// key: "TODO"
///
/// # Roots to walk; always visited even when excluded below
/// include_paths:
///   - "notes"
///   - "README.md"
///
/// # Extensions to scan, with or without the leading dot (omit to scan everything)
/// include_exts:
///   - ".md"
///   - ".txt"
///
/// # Subtrees to skip
/// exclude_paths:
///   - "notes/archive"
///
/// # Tokens per snippet window
/// snippet_width: 11
///
/// # failfast or lossy
/// encoding_mode: "failfast"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// Relative `include_paths` and `exclude_paths` are resolved against the working directory
/// of the process when the search starts, not against the directory holding the file
/// they were read from.
///
/// When using the CLI, command-line arguments take precedence over config file values;
/// see [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Text to search for
    #[serde(default)]
    pub key: String,

    /// Roots to walk, in order
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// Extensions to include (e.g., [".md", ".txt"]).
    /// If None, all files are included
    #[serde(default)]
    pub include_exts: Option<Vec<String>>,

    /// Files or subtrees to skip
    #[serde(default)]
    pub exclude_paths: Vec<PathBuf>,

    /// Tokens per snippet window
    #[serde(default = "default_snippet_width")]
    pub snippet_width: usize,

    /// How to treat invalid UTF-8
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_snippet_width() -> usize {
    DEFAULT_SNIPPET_WIDTH
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            include_paths: Vec::new(),
            include_exts: None,
            exclude_paths: Vec::new(),
            snippet_width: default_snippet_width(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Global and local defaults are optional
        let defaults = [
            dirs::config_dir().map(|p| p.join("pke/config.yaml")),
            Some(PathBuf::from(".pke.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.key.is_empty() {
            self.key = cli_config.key;
        }
        if !cli_config.include_paths.is_empty() {
            self.include_paths = cli_config.include_paths;
        }
        if cli_config.include_exts.is_some() {
            self.include_exts = cli_config.include_exts;
        }
        if !cli_config.exclude_paths.is_empty() {
            self.exclude_paths = cli_config.exclude_paths;
        }
        if cli_config.snippet_width != default_snippet_width() {
            self.snippet_width = cli_config.snippet_width;
        }
        if cli_config.encoding_mode != EncodingMode::default() {
            self.encoding_mode = cli_config.encoding_mode;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }

    /// Validates the configuration and turns it into a request
    pub fn to_request(&self) -> SearchResult<SearchRequest> {
        SearchRequest::new(
            self.key.clone(),
            self.include_paths.clone(),
            ExtensionFilter::from(self.include_exts.clone()),
            self.exclude_paths.clone(),
        )
        .map(|request| {
            request
                .with_snippet_width(self.snippet_width)
                .with_encoding_mode(self.encoding_mode)
        })
    }
}
