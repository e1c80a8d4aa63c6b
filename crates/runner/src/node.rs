//! Node-backed spec engine
//!
//! Runs the registered specs with Jasmine under node. Events come back as
//! marked JSON lines on stdout; everything else the specs print is echoed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{AssetPaths, RunConfiguration};
use crate::engine::{ExecuteOptions, SpecEngine};
use crate::error::{PluginError, PluginResult};
use crate::reporter::{Reporter, SpecResult, SuiteSummary};

/// Prefix of event lines written by `node_runner.js`
const EVENT_MARKER: &str = "##specrun ";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum NodeEvent {
    #[serde(rename_all = "camelCase")]
    JasmineStarted { total_specs_defined: usize },
    SpecDone(SpecResult),
    JasmineDone,
}

/// Spec engine that shells out to node
pub struct NodeEngine {
    node: PathBuf,
    node_runner: PathBuf,
    jasmine_core: PathBuf,
    assets: AssetPaths,
    specs: Vec<PathBuf>,
    reporters: Vec<Box<dyn Reporter>>,
}

impl NodeEngine {
    pub fn new(config: &RunConfiguration) -> Self {
        let assets = config.asset_paths();
        let jasmine_core = assets.jasmine_core().to_path_buf();
        Self {
            node: config.node.clone().unwrap_or_else(|| PathBuf::from("node")),
            node_runner: assets.node_runner.clone(),
            jasmine_core,
            assets,
            specs: Vec::new(),
            reporters: Vec::new(),
        }
    }

    pub fn specs(&self) -> &[PathBuf] {
        &self.specs
    }
}

fn parse_event(line: &str) -> PluginResult<Option<NodeEvent>> {
    match line.strip_prefix(EVENT_MARKER) {
        Some(json) => Ok(Some(serde_json::from_str(json)?)),
        None => Ok(None),
    }
}

/// Decode one raw stdout line, dropping the line terminator
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Dispatch events from node's stdout until it closes.
///
/// Returns the summary and whether `jasmineDone` arrived.
async fn read_events<R>(
    stdout: R,
    primary: &mut dyn Reporter,
    reporters: &mut [Box<dyn Reporter>],
    start: Instant,
) -> PluginResult<(SuiteSummary, bool)>
where
    R: AsyncRead + Unpin + Send,
{
    let mut reader = BufReader::new(stdout);
    let mut raw = Vec::new();
    let mut summary = SuiteSummary::default();
    let mut finished = false;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }
        let line = decode_line(&raw);

        match parse_event(&line)? {
            Some(NodeEvent::JasmineStarted { total_specs_defined }) => {
                primary.jasmine_started(total_specs_defined);
                for reporter in reporters.iter_mut() {
                    reporter.jasmine_started(total_specs_defined);
                }
            }
            Some(NodeEvent::SpecDone(result)) => {
                summary.record(&result);
                primary.spec_done(&result);
                for reporter in reporters.iter_mut() {
                    reporter.spec_done(&result);
                }
            }
            Some(NodeEvent::JasmineDone) => {
                finished = true;
                summary.duration_ms = start.elapsed().as_millis() as u64;
                primary.jasmine_done(&summary);
                for reporter in reporters.iter_mut() {
                    reporter.jasmine_done(&summary);
                }
            }
            None => println!("{}", line),
        }
    }

    Ok((summary, finished))
}

#[async_trait]
impl SpecEngine for NodeEngine {
    fn add_spec(&mut self, path: &Path) {
        self.specs.push(path.to_path_buf());
    }

    fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    async fn execute(&mut self, options: ExecuteOptions) -> PluginResult<bool> {
        self.assets.check_framework_core()?;

        let start = Instant::now();
        let mut primary = options.reporter;

        debug!(
            "Running {} spec file(s) with {}",
            self.specs.len(),
            self.node.display()
        );

        let mut child = Command::new(&self.node)
            .arg(&self.node_runner)
            .arg(&self.jasmine_core)
            .args(&self.specs)
            .env("FORCE_COLOR", if options.show_colors { "1" } else { "0" })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PluginError::ExecutableUnavailable {
                executable: self.node.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PluginError::Engine("node stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PluginError::Engine("node stderr not captured".to_string()))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        let events = read_events(stdout, primary.as_mut(), &mut self.reporters, start).await;
        let (summary, finished) = match events {
            Ok(events) => events,
            Err(e) => {
                error!("Stopping node: {}", e);
                let _ = child.start_kill();
                let _ = child.wait().await;
                stderr_task.abort();
                return Err(e);
            }
        };

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !finished {
            error!("node exited ({}) before the suite finished", status);
            if !stderr.is_empty() {
                error!("stderr: {}", stderr.trim_end());
            }
            return Err(PluginError::Engine(format!(
                "spec run aborted ({}): {}",
                status,
                stderr.lines().next().unwrap_or("no output")
            )));
        }

        info!(
            "{} passed, {} failed, {} pending ({} ms)",
            summary.passed, summary.failed, summary.pending, summary.duration_ms
        );
        Ok(summary.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::SpecStatus;

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(parse_event("plain output").unwrap(), None);
        assert_eq!(
            parse_event(r#"##specrun {"event":"jasmineStarted","totalSpecsDefined":3}"#).unwrap(),
            Some(NodeEvent::JasmineStarted { total_specs_defined: 3 })
        );
        assert_eq!(
            parse_event(r#"##specrun {"event":"jasmineDone"}"#).unwrap(),
            Some(NodeEvent::JasmineDone)
        );

        let done = parse_event(
            r#"##specrun {"event":"specDone","fullName":"a b","status":"failed","failedExpectations":[{"message":"nope","stack":null}]}"#,
        )
        .unwrap();
        match done {
            Some(NodeEvent::SpecDone(result)) => {
                assert_eq!(result.full_name, "a b");
                assert_eq!(result.status, SpecStatus::Failed);
                assert_eq!(result.failed_expectations[0].message, "nope");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_disabled_specs_count_as_excluded() {
        let event = parse_event(r#"##specrun {"event":"specDone","fullName":"x","status":"disabled"}"#).unwrap();
        assert!(matches!(event, Some(NodeEvent::SpecDone(r)) if r.status == SpecStatus::Excluded));
    }

    #[test]
    fn test_decode_line_is_lossy() {
        assert_eq!(decode_line(b"ok\r\n"), "ok");
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{fffd}");
        assert_eq!(decode_line(b"tail"), "tail");
    }

    #[test]
    fn test_malformed_event_is_an_error() {
        assert!(parse_event("##specrun {not json").is_err());
    }

    #[test]
    fn test_engine_uses_configured_assets() {
        let config = RunConfiguration {
            assets_dir: Some(PathBuf::from("/assets")),
            jasmine_version: Some("2.3".to_string()),
            ..Default::default()
        };
        let mut engine = NodeEngine::new(&config);
        engine.add_spec(Path::new("spec/a_spec.js"));

        assert_eq!(engine.node, PathBuf::from("node"));
        assert_eq!(engine.node_runner, PathBuf::from("/assets/lib/node_runner.js"));
        assert_eq!(engine.jasmine_core, PathBuf::from("/assets/vendor/jasmine-2.3/jasmine.js"));
        assert_eq!(engine.specs(), &[PathBuf::from("spec/a_spec.js")]);
    }
}
