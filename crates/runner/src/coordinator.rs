//! Pipeline coordinator
//!
//! Collects spec paths as the pipeline delivers them and, once the input ends,
//! runs them either in-process through a [`SpecEngine`] or in the headless
//! browser through the [`ProcessOrchestrator`].

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::RunConfiguration;
use crate::engine::{ExecuteOptions, SpecEngine};
use crate::error::PluginResult;
use crate::harness::HarnessGenerator;
use crate::node::NodeEngine;
use crate::orchestrator::ProcessOrchestrator;
use crate::pipeline::{Plugin, SourceFile};
use crate::reporter::{build_reporter, Reporter, TerminalReporter};

/// Execution mode, fixed when the coordinator is built
pub enum Mode<E> {
    /// Run through the headless browser
    Integration,
    /// Run with an in-process engine
    InProcess(E),
}

/// Pipeline stage that runs the collected specs at stream end
pub struct Coordinator<E: SpecEngine> {
    config: RunConfiguration,
    mode: Mode<E>,
    files: Vec<PathBuf>,
    exit_code: i32,
}

/// Coordinator backed by the node engine
pub type NodeCoordinator = Coordinator<NodeEngine>;

impl NodeCoordinator {
    pub fn from_config(config: RunConfiguration) -> Self {
        let engine = NodeEngine::new(&config);
        Self::new(config, engine)
    }
}

impl<E: SpecEngine> Coordinator<E> {
    /// Pick the mode from `config.integration`; the engine is only used in-process
    pub fn new(config: RunConfiguration, mut engine: E) -> Self {
        let mode = if config.integration {
            Mode::Integration
        } else {
            for spec in &config.reporters {
                engine.add_reporter(build_reporter(spec, config.include_stack_trace));
            }
            Mode::InProcess(engine)
        };

        Self {
            config,
            mode,
            files: Vec::new(),
            exit_code: 0,
        }
    }

    /// Attach an additional in-process reporter
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        if let Mode::InProcess(engine) = &mut self.mode {
            engine.add_reporter(reporter);
        }
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    pub fn mode(&self) -> &Mode<E> {
        &self.mode
    }

    pub fn is_integration(&self) -> bool {
        matches!(self.mode, Mode::Integration)
    }

    /// Spec paths collected so far, in arrival order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Status the host process should exit with; 1 once an in-process run failed
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

#[async_trait]
impl<E: SpecEngine> Plugin for Coordinator<E> {
    fn transform(&mut self, file: SourceFile) -> PluginResult<SourceFile> {
        if file.is_null() {
            return Ok(file);
        }
        if let Err(e) = file.ensure_not_streamed() {
            error!("{}", e);
            return Err(e);
        }

        if let Mode::InProcess(engine) = &mut self.mode {
            engine.add_spec(&file.path);
        }
        self.files.push(file.path.clone());
        Ok(file)
    }

    async fn flush(&mut self) -> PluginResult<()> {
        let result = match &mut self.mode {
            Mode::Integration => run_integration(&self.config, &self.files).await,
            Mode::InProcess(engine) => {
                let (passed, result) = run_in_process(&self.config, &self.files, engine).await;
                if !passed {
                    self.exit_code = 1;
                }
                result
            }
        };

        result.map_err(|e| {
            let e = e.wrap();
            error!("{}: {}", e.plugin(), e);
            e
        })
    }
}

async fn run_integration(config: &RunConfiguration, files: &[PathBuf]) -> PluginResult<()> {
    info!("Running Jasmine with PhantomJS");
    let orchestrator = ProcessOrchestrator::new(config);

    match &config.spec_html {
        Some(spec_html) => {
            let harness = std::env::current_dir()?.join(spec_html);
            orchestrator.run(&harness).await
        }
        None => {
            let harness = HarnessGenerator::new(config)?.generate(files).await?;
            orchestrator.run(&harness).await
        }
    }
}

/// Returns whether every spec passed alongside the completion result
async fn run_in_process<E: SpecEngine>(
    config: &RunConfiguration,
    files: &[PathBuf],
    engine: &mut E,
) -> (bool, PluginResult<()>) {
    info!("Running Jasmine in-process");

    let options = ExecuteOptions {
        reporter: Box::new(TerminalReporter::new(true, config.include_stack_trace)),
        show_colors: true,
        include_stack_trace: config.include_stack_trace,
    };
    let passed = match engine.execute(options).await {
        Ok(passed) => passed,
        Err(e) => return (true, Err(e)),
    };

    if config.keeps_runner() {
        let kept = match HarnessGenerator::new(config) {
            Ok(generator) => generator.generate(files).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = kept {
            return (passed, Err(e));
        }
    }

    if !passed {
        error!("Specs contained failures");
    }
    (passed, Ok(()))
}
