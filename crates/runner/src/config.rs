//! Run configuration
//!
//! One [`RunConfiguration`] is built per pipeline invocation and threaded through
//! every operation. Field names serialize to the option names the headless
//! runner script reads (`specHtml`, `keepRunner`, ...).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PluginError, PluginResult};

/// Framework asset set used when no version is configured
pub const DEFAULT_JASMINE_VERSION: &str = "2.0";

/// File name of the generated harness
pub const HARNESS_FILE_NAME: &str = "specRunner.html";

/// Options controlling both execution modes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfiguration {
    /// Run through the headless browser instead of in-process
    pub integration: bool,

    /// Existing harness to reuse instead of generating one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_html: Option<PathBuf>,

    /// Keep the generated harness, optionally in a custom directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_runner: Option<KeepRunner>,

    /// Extra scripts injected into the harness (globs or URLs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<OneOrMany<String>>,

    /// Additional in-process reporters
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reporters: Vec<ReporterSpec>,

    /// Which bundled framework asset set to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jasmine_version: Option<String>,

    pub include_stack_trace: bool,

    /// Root of the bundled assets (template, runner scripts, vendor dirs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,

    /// Headless browser executable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phantomjs: Option<PathBuf>,

    /// Node executable used by the node spec engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<PathBuf>,
}

/// `keepRunner` accepts either a flag or a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeepRunner {
    Flag(bool),
    Dir(PathBuf),
}

/// A single value or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(vs) => vs.clone(),
        }
    }
}

/// Serializable description of an additional reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReporterSpec {
    /// Another terminal reporter (e.g. with different verbosity)
    Terminal {
        #[serde(default)]
        show_colors: bool,
    },
    /// Write suite results as JSON
    Json { path: PathBuf },
}

impl RunConfiguration {
    /// Load configuration from a TOML file, falling back to defaults when absent
    pub fn load(path: &Path) -> PluginResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Whether the generated harness should survive the run
    pub fn keeps_runner(&self) -> bool {
        match &self.keep_runner {
            None | Some(KeepRunner::Flag(false)) => false,
            Some(KeepRunner::Flag(true)) | Some(KeepRunner::Dir(_)) => true,
        }
    }

    /// Custom harness directory, when `keepRunner` names one
    pub fn keep_runner_dir(&self) -> Option<&Path> {
        match &self.keep_runner {
            Some(KeepRunner::Dir(dir)) => Some(dir.as_path()),
            _ => None,
        }
    }

    /// The harness is deleted unless the caller supplied it or asked to keep it
    pub fn should_cleanup(&self) -> bool {
        self.spec_html.is_none() && !self.keeps_runner()
    }

    pub fn vendor_entries(&self) -> Vec<String> {
        self.vendor.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }

    pub fn jasmine_version(&self) -> &str {
        self.jasmine_version.as_deref().unwrap_or(DEFAULT_JASMINE_VERSION)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.assets_dir
            .clone()
            .unwrap_or_else(default_assets_dir)
    }

    /// Paths derived from the assets directory and framework version
    pub fn asset_paths(&self) -> AssetPaths {
        AssetPaths::new(&self.assets_dir(), self.jasmine_version())
    }

    /// JSON handed to the headless runner as its last argument
    pub fn to_json(&self) -> PluginResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Assets directory used when none is configured.
///
/// An `assets/` directory next to the running executable wins; otherwise the
/// assets bundled with this crate's sources are used.
pub fn default_assets_dir() -> PathBuf {
    let installed = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")));
    locate_assets_dir(installed)
}

fn locate_assets_dir(installed: Option<PathBuf>) -> PathBuf {
    match installed {
        Some(dir) if dir.join("lib").is_dir() => dir,
        _ => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"),
    }
}

/// Asset locations for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPaths {
    /// `vendor/jasmine-<version>` directory of the selected asset set
    pub framework_dir: PathBuf,
    pub jasmine_css: PathBuf,
    /// Framework scripts, in load order
    pub jasmine_js: Vec<PathBuf>,
    /// In-page script that loads the embedded spec list
    pub spec_runner: PathBuf,
    /// Script handed to the headless browser
    pub jasmine_runner: PathBuf,
    /// Entry script of the node spec engine
    pub node_runner: PathBuf,
    pub template: PathBuf,
    pub default_harness: PathBuf,
}

impl AssetPaths {
    pub fn new(assets_dir: &Path, version: &str) -> Self {
        let framework = assets_dir.join("vendor").join(format!("jasmine-{}", version));
        let lib = assets_dir.join("lib");

        Self {
            jasmine_css: framework.join("jasmine.css"),
            jasmine_js: vec![
                framework.join("jasmine.js"),
                framework.join("jasmine-html.js"),
                framework.join("console.js"),
                framework.join("boot.js"),
            ],
            spec_runner: lib.join("spec_runner.js"),
            jasmine_runner: lib.join("jasmine_runner.js"),
            node_runner: lib.join("node_runner.js"),
            template: lib.join("spec_runner.html"),
            default_harness: lib.join(HARNESS_FILE_NAME),
            framework_dir: framework,
        }
    }

    /// The framework core script (first in load order)
    pub fn jasmine_core(&self) -> &Path {
        &self.jasmine_js[0]
    }

    /// Fail unless every framework file the harness references is installed
    pub fn check_framework(&self) -> PluginResult<()> {
        self.require(std::iter::once(&self.jasmine_css).chain(&self.jasmine_js))
    }

    /// Fail unless the framework core is installed
    pub fn check_framework_core(&self) -> PluginResult<()> {
        self.require(self.jasmine_js.iter().take(1))
    }

    fn require<'a>(&self, files: impl IntoIterator<Item = &'a PathBuf>) -> PluginResult<()> {
        match files.into_iter().find(|file| !file.is_file()) {
            Some(missing) => Err(PluginError::FrameworkMissing {
                dir: self.framework_dir.clone(),
                file: missing.clone(),
            }),
            None => Ok(()),
        }
    }
}
