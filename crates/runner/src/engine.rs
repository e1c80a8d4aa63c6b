//! In-process spec engine interface

use std::path::Path;

use async_trait::async_trait;

use crate::error::PluginResult;
use crate::reporter::Reporter;

/// Options for one engine execution
pub struct ExecuteOptions {
    /// Primary reporter, called alongside any added with [`SpecEngine::add_reporter`]
    pub reporter: Box<dyn Reporter>,
    pub show_colors: bool,
    pub include_stack_trace: bool,
}

/// A test engine that runs registered spec files
///
/// Implementations must read spec sources from disk on every execution so a
/// repeated run observes current file contents.
#[async_trait]
pub trait SpecEngine: Send {
    /// Register a spec source
    fn add_spec(&mut self, path: &Path);

    fn add_reporter(&mut self, reporter: Box<dyn Reporter>);

    /// Run every registered spec; `Ok(true)` when all passed
    async fn execute(&mut self, options: ExecuteOptions) -> PluginResult<bool>;
}
