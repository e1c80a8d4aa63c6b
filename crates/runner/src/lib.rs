//! specrun runner
//!
//! A file-pipeline stage that runs Jasmine specs:
//! - Collects spec paths as the pipeline delivers them (pass-through)
//! - Runs them in-process through a [`SpecEngine`], or
//! - Renders a spec runner page and drives PhantomJS against it
//! - Reports the outcome as the pipeline's terminal signal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Coordinator (pipeline Plugin)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transform(file)  -> collect path, pass file through        │
//! │  flush()                                                    │
//! │    ├── integration                                          │
//! │    │     ├── HarnessGenerator::generate(files) -> page      │
//! │    │     └── ProcessOrchestrator::run(page)                 │
//! │    │           phantomjs jasmine_runner.js page <json>      │
//! │    └── in-process                                           │
//! │          ├── SpecEngine::execute(reporters) -> passed       │
//! │          └── keepRunner? HarnessGenerator::generate(files)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod harness;
pub mod node;
pub mod orchestrator;
pub mod pipeline;
pub mod reporter;

pub use config::{KeepRunner, OneOrMany, ReporterSpec, RunConfiguration};
pub use coordinator::{Coordinator, Mode, NodeCoordinator};
pub use engine::{ExecuteOptions, SpecEngine};
pub use error::{PluginError, PluginResult, PLUGIN_NAME};
pub use pipeline::{drive, Contents, PipelineRun, Plugin, SourceFile};
pub use reporter::{Reporter, SpecResult, SpecStatus, SuiteSummary};
