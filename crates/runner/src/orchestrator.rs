//! Headless browser process orchestration
//!
//! Invokes PhantomJS with the bundled runner script, the harness page and the
//! JSON run configuration, then classifies the outcome from its exit status
//! and standard error.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::RunConfiguration;
use crate::error::{PluginError, PluginResult};

/// Headless executable name for the host platform
pub fn default_executable() -> &'static str {
    if cfg!(windows) {
        "phantomjs.cmd"
    } else {
        "phantomjs"
    }
}

/// How a finished headless run is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// Non-zero exit
    TestsFailed,
    /// Clean exit but something was written to standard error
    RunnerOpenFailed,
}

/// Classify a finished run. Any standard error output fails the run.
pub fn classify(exit_success: bool, stderr: &str) -> Classification {
    if !exit_success {
        Classification::TestsFailed
    } else if !stderr.is_empty() {
        Classification::RunnerOpenFailed
    } else {
        Classification::Success
    }
}

/// Runs the headless executable against a harness
pub struct ProcessOrchestrator<'a> {
    config: &'a RunConfiguration,
}

impl<'a> ProcessOrchestrator<'a> {
    pub fn new(config: &'a RunConfiguration) -> Self {
        Self { config }
    }

    pub fn executable(&self) -> PathBuf {
        self.config
            .phantomjs
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_executable()))
    }

    /// Positional arguments: runner script, harness, serialized configuration
    pub fn arguments(&self, harness: &Path) -> PluginResult<Vec<String>> {
        Ok(vec![
            self.config.asset_paths().jasmine_runner.to_string_lossy().into_owned(),
            harness.to_string_lossy().into_owned(),
            self.config.to_json()?,
        ])
    }

    /// Run the executable against `harness` and classify the result.
    ///
    /// Waits as long as the executable runs. The harness is removed afterwards
    /// unless the configuration supplied or keeps it.
    pub async fn run(&self, harness: &Path) -> PluginResult<()> {
        let executable = self.executable();
        let args = self.arguments(harness)?;
        debug!("{} {:?}", executable.display(), args);

        let output = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await;

        let result = match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);

                if !stderr.is_empty() {
                    error!("Failed to open test runner {}", harness.display());
                    error!("error: {}", stderr.trim_end());
                }

                let classification = classify(output.status.success(), &stderr);
                if classification == Classification::TestsFailed {
                    warn!("{} exited with {}", executable.display(), output.status);
                }

                println!("{}", stdout);

                match classification {
                    Classification::Success => Ok(()),
                    Classification::TestsFailed => Err(PluginError::TestsFailed),
                    Classification::RunnerOpenFailed => Err(PluginError::RunnerOpenFailed {
                        harness: harness.to_path_buf(),
                    }),
                }
            }
            Err(source) => {
                error!("Could not start {}: {}", executable.display(), source);
                Err(PluginError::ExecutableUnavailable {
                    executable: executable.display().to_string(),
                    source,
                })
            }
        };

        if self.config.should_cleanup() {
            cleanup(harness).await;
        }

        result
    }
}

/// Remove a generated harness
async fn cleanup(harness: &Path) {
    match tokio::fs::remove_file(harness).await {
        Ok(()) => info!("Removed {}", harness.display()),
        Err(e) => warn!("Failed to remove {}: {}", harness.display(), e),
    }
}
