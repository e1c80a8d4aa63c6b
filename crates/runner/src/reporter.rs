//! Spec result reporters

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ReporterSpec;

/// Final status of a single spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
    #[serde(alias = "disabled")]
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedExpectation {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
}

/// Result of running one spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecResult {
    pub full_name: String,
    pub status: SpecStatus,
    #[serde(default)]
    pub failed_expectations: Vec<FailedExpectation>,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub duration_ms: u64,
}

impl SuiteSummary {
    pub fn record(&mut self, result: &SpecResult) {
        self.total += 1;
        match result.status {
            SpecStatus::Passed => self.passed += 1,
            SpecStatus::Failed => self.failed += 1,
            SpecStatus::Pending | SpecStatus::Excluded => self.pending += 1,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Receives spec events from an engine
pub trait Reporter: Send {
    fn jasmine_started(&mut self, _total: usize) {}

    fn spec_done(&mut self, result: &SpecResult);

    fn jasmine_done(&mut self, summary: &SuiteSummary);
}

/// Build the reporter a [`ReporterSpec`] describes
pub fn build_reporter(spec: &ReporterSpec, include_stack_trace: bool) -> Box<dyn Reporter> {
    match spec {
        ReporterSpec::Terminal { show_colors } => {
            Box::new(TerminalReporter::new(*show_colors, include_stack_trace))
        }
        ReporterSpec::Json { path } => Box::new(JsonReporter::new(path.clone())),
    }
}

/// Dot-style progress with a failure listing at the end
pub struct TerminalReporter {
    show_colors: bool,
    include_stack_trace: bool,
    failures: Vec<SpecResult>,
    started: Option<Instant>,
    out: Box<dyn Write + Send>,
}

impl TerminalReporter {
    pub fn new(show_colors: bool, include_stack_trace: bool) -> Self {
        Self::with_writer(show_colors, include_stack_trace, Box::new(std::io::stdout()))
    }

    pub fn with_writer(show_colors: bool, include_stack_trace: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            show_colors,
            include_stack_trace,
            failures: Vec::new(),
            started: None,
            out,
        }
    }

    fn paint(&self, text: &str, status: SpecStatus) -> String {
        if !self.show_colors {
            return text.to_string();
        }
        match status {
            SpecStatus::Passed => text.green().to_string(),
            SpecStatus::Failed => text.red().to_string(),
            SpecStatus::Pending | SpecStatus::Excluded => text.yellow().to_string(),
        }
    }

    fn write_summary(&mut self, summary: &SuiteSummary) -> std::io::Result<()> {
        writeln!(self.out)?;

        for (i, failure) in self.failures.iter().enumerate() {
            writeln!(self.out)?;
            writeln!(self.out, "{}) {}", i + 1, failure.full_name)?;
            for expectation in &failure.failed_expectations {
                let message = self.paint(&format!("Message: {}", expectation.message), SpecStatus::Failed);
                writeln!(self.out, "  {}", message)?;
                if self.include_stack_trace {
                    if let Some(stack) = &expectation.stack {
                        writeln!(self.out, "  Stacktrace:")?;
                        for line in stack.lines() {
                            writeln!(self.out, "    {}", line)?;
                        }
                    }
                }
            }
        }

        let elapsed = self
            .started
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(summary.duration_ms as f64 / 1000.0);
        writeln!(self.out)?;
        writeln!(self.out, "Finished in {:.3} seconds", elapsed)?;

        let mut line = format!(
            "{} spec{}, {} failure{}",
            summary.total,
            if summary.total == 1 { "" } else { "s" },
            summary.failed,
            if summary.failed == 1 { "" } else { "s" },
        );
        if summary.pending > 0 {
            line.push_str(&format!(", {} pending", summary.pending));
        }
        let status = if summary.success() { SpecStatus::Passed } else { SpecStatus::Failed };
        let line = self.paint(&line, status);
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}

impl Reporter for TerminalReporter {
    fn jasmine_started(&mut self, _total: usize) {
        self.started = Some(Instant::now());
    }

    fn spec_done(&mut self, result: &SpecResult) {
        let mark = match result.status {
            SpecStatus::Passed => ".",
            SpecStatus::Failed => "F",
            SpecStatus::Pending | SpecStatus::Excluded => "*",
        };
        let mark = self.paint(mark, result.status);
        let _ = write!(self.out, "{}", mark);
        let _ = self.out.flush();

        if result.status == SpecStatus::Failed {
            self.failures.push(result.clone());
        }
    }

    fn jasmine_done(&mut self, summary: &SuiteSummary) {
        if let Err(e) = self.write_summary(summary) {
            warn!("Terminal reporter failed to write summary: {}", e);
        }
    }
}

/// Suite results as written by [`JsonReporter`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub summary: SuiteSummary,
    pub results: Vec<SpecResult>,
}

/// Writes all results to a JSON file when the suite finishes
pub struct JsonReporter {
    path: PathBuf,
    results: Vec<SpecResult>,
}

impl JsonReporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, results: Vec::new() }
    }

    fn write(&self, summary: &SuiteSummary) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let report = JsonReport { summary: summary.clone(), results: self.results.clone() };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.path, json)
    }
}

impl Reporter for JsonReporter {
    fn spec_done(&mut self, result: &SpecResult) {
        self.results.push(result.clone());
    }

    fn jasmine_done(&mut self, summary: &SuiteSummary) {
        match self.write(summary) {
            Ok(()) => info!("Results written to: {}", self.path.display()),
            Err(e) => warn!("Failed to write results to {}: {}", self.path.display(), e),
        }
    }
}
