//! Error types for the spec runner

use std::path::PathBuf;
use thiserror::Error;

/// Name reported alongside every plugin error
pub const PLUGIN_NAME: &str = "specrun";

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Streaming not supported: {}", path.display())]
    StreamingUnsupported { path: PathBuf },

    #[error("Spec runner template error at {}: {}", path.display(), source)]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Jasmine assets missing from {}: {} not found", dir.display(), file.display())]
    FrameworkMissing { dir: PathBuf, file: PathBuf },

    #[error("Tests contained failures. Check logs for details.")]
    TestsFailed,

    #[error("Failed to open test runner {}", harness.display())]
    RunnerOpenFailed { harness: PathBuf },

    #[error("Failed to launch {executable}: {source}")]
    ExecutableUnavailable {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vendor pattern '{pattern}': {source}")]
    VendorPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Spec engine error: {0}")]
    Engine(String),

    #[error("{0}")]
    Orchestration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl PluginError {
    /// Plugin that raised the error
    pub fn plugin(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Rewrap anything that escaped a mode's flush into the uniform plugin error.
    ///
    /// Errors already belonging to the run taxonomy are kept as they are.
    pub fn wrap(self) -> Self {
        match self {
            PluginError::Io(e) => PluginError::Orchestration(e.to_string()),
            PluginError::Json(e) => PluginError::Orchestration(e.to_string()),
            PluginError::Config(e) => PluginError::Orchestration(e.to_string()),
            other => other,
        }
    }
}

pub type PluginResult<T> = Result<T, PluginError>;
