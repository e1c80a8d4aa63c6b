//! File pipeline contract
//!
//! A pipeline delivers [`SourceFile`]s one at a time to a [`Plugin`], which
//! passes each file through unchanged and signals a terminal result once the
//! input ends.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::{PluginError, PluginResult};

/// Content representation of a file flowing through the pipeline
pub enum Contents {
    /// Directory entries and files read with contents disabled
    Null,
    Buffer(Vec<u8>),
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => f.write_str("Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A file description flowing through the pipeline
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: Contents,
}

impl SourceFile {
    pub fn null(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), contents: Contents::Null }
    }

    pub fn buffer(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), contents: Contents::Buffer(bytes) }
    }

    pub fn stream(path: impl Into<PathBuf>, reader: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self { path: path.into(), contents: Contents::Stream(reader) }
    }

    /// Read a file from disk into a buffered entry
    pub async fn read(path: impl Into<PathBuf>) -> PluginResult<Self> {
        let path = path.into();
        let bytes = tokio::fs::read(&path).await?;
        Ok(Self::buffer(path, bytes))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// Reject streamed contents, the only representation the runner cannot use
    pub fn ensure_not_streamed(&self) -> PluginResult<()> {
        if self.is_stream() {
            return Err(PluginError::StreamingUnsupported { path: self.path.clone() });
        }
        Ok(())
    }
}

/// A pipeline stage
#[async_trait]
pub trait Plugin: Send {
    /// Handle one file and hand it back for the next stage
    fn transform(&mut self, file: SourceFile) -> PluginResult<SourceFile>;

    /// Called once the input has ended
    async fn flush(&mut self) -> PluginResult<()>;
}

/// Outcome of driving a pipeline to completion
#[derive(Debug)]
pub struct PipelineRun {
    /// Files passed through, in input order
    pub output: Vec<SourceFile>,
    /// Terminal signal: `Ok(())` on success
    pub result: PluginResult<()>,
}

impl PipelineRun {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Feed every file of `input` through `plugin`, then flush it.
///
/// Processing stops at the first file the plugin rejects; the error becomes
/// the terminal signal and `flush` is not called.
pub async fn drive<P, S>(plugin: &mut P, input: S) -> PipelineRun
where
    P: Plugin + ?Sized,
    S: Stream<Item = SourceFile>,
{
    futures::pin_mut!(input);
    let mut output = Vec::new();

    while let Some(file) = input.next().await {
        debug!("pipeline: {}", file.path.display());
        match plugin.transform(file) {
            Ok(file) => output.push(file),
            Err(e) => return PipelineRun { output, result: Err(e) },
        }
    }

    let result = plugin.flush().await;
    PipelineRun { output, result }
}
