/// Trait definitions for external tool execution
///
/// The orchestrator only needs to start a search and learn its process id;
/// completion is observed later through the output files. Keeping the
/// launch behind a trait lets tests substitute a mock or a fake binary.
use crate::blast::params::Invocation;
use std::io;

/// Starts one search process without waiting for it
#[cfg_attr(test, mockall::automock)]
pub trait Launcher: Send + Sync {
    /// Spawn the invocation and return its OS process id
    fn launch(&self, invocation: &Invocation) -> io::Result<u32>;

    /// Verify that the tool can be found
    fn verify_installation(&self) -> io::Result<()> {
        Ok(())
    }

    /// Name of the tool for logs
    fn name(&self) -> &str;
}
