//! Compiler configuration (gvm.toml)
//!
//! Handles parsing of the optional `gvm.toml` file that tunes the
//! transformer. Every key has a default, so an empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name that is pinned to function index 0 by default
pub const DEFAULT_ENTRY_FUNCTION: &str = "__function_selector__";

/// Configuration file name searched by [`CompilerConfig::find_and_load`]
pub const CONFIG_FILE: &str = "gvm.toml";

/// Top-level layout of gvm.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    compiler: CompilerConfig,
}

/// `[compiler]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Function compiled to index 0 and designated as entry
    #[serde(default = "default_entry_function")]
    pub entry_function: String,

    /// Check that every declared predecessor address exists
    #[serde(default = "default_true")]
    pub validate_predecessors: bool,

    /// Record `CALLPRIVATE` call sites whose callee is a known function
    #[serde(default = "default_true")]
    pub resolve_private_calls: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            entry_function: default_entry_function(),
            validate_predecessors: true,
            resolve_private_calls: true,
        }
    }
}

fn default_entry_function() -> String {
    DEFAULT_ENTRY_FUNCTION.to_string()
}

fn default_true() -> bool {
    true
}

impl CompilerConfig {
    /// Parse a configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))?;
        Ok(file.compiler)
    }

    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Find and load gvm.toml by searching up from `start_dir`
    ///
    /// Falls back to the default configuration when no file exists.
    pub fn find_and_load(start_dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::from_file(&config_path)?;
                tracing::debug!(path = %config_path.display(), "loaded compiler config");
                return Ok((config, Some(config_path)));
            }

            if !current.pop() {
                return Ok((Self::default(), None));
            }
        }
    }

    /// Serialize configuration to TOML string
    pub fn to_string(&self) -> Result<String> {
        let file = ConfigFile { compiler: self.clone() };
        toml::to_string_pretty(&file)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}
