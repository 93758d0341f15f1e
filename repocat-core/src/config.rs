//! Configuration management

use crate::error::{ErrorContext, RepocatError, RepocatResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepocatConfig {
    pub documents: DocumentConfig,
    pub history: HistoryConfig,
    pub checkout: CheckoutConfig,
}

/// Documentation extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// License file basenames, highest priority first
    pub license_basenames: Vec<String>,
    /// Readme file basenames, highest priority first
    pub readme_basenames: Vec<String>,
    /// Documents larger than this are not converted
    pub max_document_bytes: Option<u64>,
    /// Converter reading POD on stdin and writing Markdown on stdout
    pub pod_converter: ExternalCommand,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            license_basenames: vec!["LICENSE".to_string(), "COPYING".to_string()],
            readme_basenames: vec!["README".to_string()],
            max_document_bytes: None,
            pod_converter: ExternalCommand {
                program: "pod2markdown".to_string(),
                args: vec![],
            },
        }
    }
}

/// History dump settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Size of each read from the command's stdout
    pub read_buffer_size: usize,
    /// Abort the history dump after this many seconds
    pub timeout_secs: Option<u64>,
    /// Command printing the three-line-per-commit log, run inside the checkout
    pub command: ExternalCommand,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8192,
            timeout_secs: None,
            command: ExternalCommand {
                program: "git".to_string(),
                args: [
                    "--no-pager",
                    "log",
                    "--reverse",
                    "--pretty=tformat:%cd|%H|%aN|%aE",
                    "--no-merges",
                    "--date=iso",
                    "--shortstat",
                ]
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
            },
        }
    }
}

/// Working copy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Base directory for clones; a leading `~` expands to the home directory
    pub work_dir: String,
    /// Clone depth (None = full clone, required for complete statistics)
    pub clone_depth: Option<u32>,
    /// Attempts for a failing clone
    pub retry_attempts: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            work_dir: "~/.repocat".to_string(),
            clone_depth: None,
            retry_attempts: 3,
        }
    }
}

impl CheckoutConfig {
    /// Resolve `work_dir` to a filesystem path
    pub fn work_dir_path(&self) -> PathBuf {
        match self.work_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.work_dir)),
            None => PathBuf::from(&self.work_dir),
        }
    }
}

/// Program plus fixed arguments of an external tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RepocatConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RepocatResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RepocatError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: RepocatConfig = toml::from_str(&content).map_err(|e| RepocatError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RepocatResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RepocatError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| RepocatError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> RepocatResult<()> {
        if self.history.read_buffer_size == 0 {
            return Err(RepocatError::Config {
                message: "history.read_buffer_size must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set history.read_buffer_size to a positive value"),
            });
        }

        if self.history.command.program.trim().is_empty() {
            return Err(crate::config_error!(
                "history.command.program must not be empty",
                "config"
            ));
        }

        if self.documents.pod_converter.program.trim().is_empty() {
            return Err(crate::config_error!(
                "documents.pod_converter.program must not be empty",
                "config"
            ));
        }

        if self.checkout.retry_attempts == 0 {
            return Err(RepocatError::Config {
                message: "checkout.retry_attempts must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set checkout.retry_attempts to at least 1"),
            });
        }

        Ok(())
    }
}
