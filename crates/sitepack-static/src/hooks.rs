//! Build lifecycle hooks.

use std::path::PathBuf;

/// Error returned by a hook. Any hook error fails the build.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Emitted once per build, after every output byte has been fsynced.
///
/// Only [`SiteBuilder`](crate::SiteBuilder) constructs this, after its
/// durability barrier, so a hook never observes a half-written output tree.
#[derive(Debug, Clone)]
pub struct WriteComplete {
    /// Resolved output directory
    pub output_dir: PathBuf,

    /// Compiled documents, in entry declaration order
    pub documents: Vec<PathBuf>,
}

/// Extension notified when the build's final write has completed.
pub trait BuildHook: Send + Sync {
    /// Hook identifier used in logs and errors
    fn name(&self) -> &'static str;

    /// Called exactly once per successful build.
    fn write_complete(&self, event: &WriteComplete) -> Result<(), HookError>;
}
