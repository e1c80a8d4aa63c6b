//! specrun - Main Entry Point
//!
//! Feeds spec files through the runner pipeline and exits with the run's
//! status: 0 when every spec passed, 1 on failing specs or a failed run,
//! 2 when the run could not be set up.

use std::path::PathBuf;

use clap::Parser;
use specrun_runner::{drive, KeepRunner, NodeCoordinator, OneOrMany, ReporterSpec, RunConfiguration};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod output;
mod sources;

/// specrun - run Jasmine specs in-process or through PhantomJS
#[derive(Parser, Debug)]
#[command(name = "specrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Spec files or glob patterns, run in the order given
    #[arg(required = true)]
    specs: Vec<String>,

    /// Configuration file (TOML); flags override its values
    #[arg(short, long, default_value = "specrun.toml")]
    config: PathBuf,

    /// Run the specs in PhantomJS instead of in-process
    #[arg(short, long)]
    integration: bool,

    /// Existing spec runner page to open instead of generating one
    #[arg(long)]
    spec_html: Option<PathBuf>,

    /// Keep the generated spec runner, optionally in DIR
    #[arg(long, num_args = 0..=1, require_equals = true, value_name = "DIR")]
    keep_runner: Option<Option<PathBuf>>,

    /// Extra script for the spec runner page (glob or URL); repeatable
    #[arg(long)]
    vendor: Vec<String>,

    /// Additional reporter: `terminal` or `json=PATH`; repeatable
    #[arg(long = "reporter", value_parser = parse_reporter)]
    reporters: Vec<ReporterSpec>,

    /// Bundled Jasmine version to use
    #[arg(long)]
    jasmine_version: Option<String>,

    /// Show stack traces for failed expectations
    #[arg(long)]
    include_stack_trace: bool,

    /// Directory holding the runner assets (`lib/`, `vendor/jasmine-<version>/`).
    /// Defaults to `assets/` next to the executable, then the assets the
    /// runner crate was built from
    #[arg(long, env = "SPECRUN_ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// PhantomJS executable
    #[arg(long, env = "PHANTOMJS_BIN")]
    phantomjs: Option<PathBuf>,

    /// Node executable for in-process runs
    #[arg(long, env = "SPECRUN_NODE")]
    node: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_reporter(value: &str) -> Result<ReporterSpec, String> {
    match value.split_once('=') {
        None if value == "terminal" => Ok(ReporterSpec::Terminal { show_colors: true }),
        Some(("json", path)) if !path.is_empty() => Ok(ReporterSpec::Json { path: PathBuf::from(path) }),
        _ => Err(format!("unknown reporter '{}' (expected `terminal` or `json=PATH`)", value)),
    }
}

impl Cli {
    /// Layer the command-line flags over `config`
    fn apply(&self, mut config: RunConfiguration) -> RunConfiguration {
        config.integration |= self.integration;
        config.include_stack_trace |= self.include_stack_trace;

        if let Some(spec_html) = &self.spec_html {
            config.spec_html = Some(spec_html.clone());
        }
        match &self.keep_runner {
            Some(Some(dir)) => config.keep_runner = Some(KeepRunner::Dir(dir.clone())),
            Some(None) => config.keep_runner = Some(KeepRunner::Flag(true)),
            None => {}
        }
        if !self.vendor.is_empty() {
            let mut vendor = config.vendor_entries();
            vendor.extend(self.vendor.iter().cloned());
            config.vendor = Some(OneOrMany::Many(vendor));
        }
        config.reporters.extend(self.reporters.iter().cloned());
        if let Some(version) = &self.jasmine_version {
            config.jasmine_version = Some(version.clone());
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = Some(dir.clone());
        }
        if let Some(phantomjs) = &self.phantomjs {
            config.phantomjs = Some(phantomjs.clone());
        }
        if let Some(node) = &self.node {
            config.node = Some(node.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            2
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.apply(RunConfiguration::load(&cli.config)?);
    debug!("configuration: {}", config.to_json()?);

    let paths = sources::expand(&cli.specs)?;
    if paths.is_empty() {
        output::print_warning("No spec files matched");
    }
    info!("Collected {} spec file(s)", paths.len());
    let files = sources::load(paths).await?;

    let mut coordinator = NodeCoordinator::from_config(config);
    let run = drive(&mut coordinator, futures::stream::iter(files)).await;

    match run.result {
        Ok(()) if coordinator.exit_code() == 0 => {
            output::print_success(&format!("{} spec file(s) passed", run.output.len()));
            Ok(0)
        }
        Ok(()) => Ok(coordinator.exit_code()),
        Err(e) => {
            output::print_error(&format!("{}: {}", e.plugin(), e));
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reporter() {
        assert_eq!(parse_reporter("terminal"), Ok(ReporterSpec::Terminal { show_colors: true }));
        assert_eq!(
            parse_reporter("json=out/results.json"),
            Ok(ReporterSpec::Json { path: PathBuf::from("out/results.json") })
        );
        assert!(parse_reporter("json=").is_err());
        assert!(parse_reporter("junit=x.xml").is_err());
    }

    #[test]
    fn test_keep_runner_flag_forms() {
        let cli = Cli::parse_from(["specrun", "--keep-runner", "a_spec.js"]);
        let config = cli.apply(RunConfiguration::default());
        assert_eq!(config.keep_runner, Some(KeepRunner::Flag(true)));

        let cli = Cli::parse_from(["specrun", "--keep-runner=out", "a_spec.js"]);
        let config = cli.apply(RunConfiguration::default());
        assert_eq!(config.keep_runner, Some(KeepRunner::Dir(PathBuf::from("out"))));
    }

    #[test]
    fn test_flags_layer_over_file_config() {
        let file = RunConfiguration {
            vendor: Some(OneOrMany::One("lib/*.js".to_string())),
            jasmine_version: Some("2.0".to_string()),
            ..Default::default()
        };
        let cli = Cli::parse_from([
            "specrun",
            "--integration",
            "--vendor",
            "https://cdn.example.com/x.js",
            "--jasmine-version",
            "2.3",
            "--reporter",
            "json=results.json",
            "spec/*_spec.js",
        ]);

        let config = cli.apply(file);

        assert!(config.integration);
        assert_eq!(
            config.vendor_entries(),
            vec!["lib/*.js".to_string(), "https://cdn.example.com/x.js".to_string()]
        );
        assert_eq!(config.jasmine_version(), "2.3");
        assert_eq!(config.reporters.len(), 1);
        assert_eq!(cli.specs, vec!["spec/*_spec.js".to_string()]);
    }
}
