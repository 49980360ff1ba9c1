//! # Managed service abstraction.
//!
//! A [`Service`] is a factory for the supervised process; every (re)start calls
//! [`Service::spawn`] and receives a fresh, exclusively owned [`ServiceProcess`].
//!
//! ```text
//! Service::spawn() ──► Box<dyn ServiceProcess>
//!                         ├─ id()    OS pid, if any
//!                         ├─ wait()  suspends until exit (cancel-safe)
//!                         └─ kill()  best-effort, idempotent
//! ```

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProcessError;

/// Shared handle to a service definition.
pub type ServiceRef = Arc<dyn Service>;

/// Owned handle to one running instance.
pub type ProcessBox = Box<dyn ServiceProcess>;

/// How a process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one (Unix).
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// An exit with the given code.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Returns `true` for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(sig)) => write!(f, "killed by signal {sig}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// A running instance of the managed service.
#[async_trait]
pub trait ServiceProcess: Send + 'static {
    /// OS process id, if the instance is an OS process.
    fn id(&self) -> Option<u32>;

    /// Suspends until the process exits. Must be cancel-safe.
    async fn wait(&mut self) -> Result<ExitInfo, ProcessError>;

    /// Terminates the process and reaps it.
    ///
    /// Calling this on an already exited process returns `Ok(())` without blocking.
    async fn kill(&mut self) -> Result<(), ProcessError>;
}

/// Definition of the managed service.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Name used in events.
    fn name(&self) -> &str;

    /// Starts a new instance.
    async fn spawn(&self) -> Result<ProcessBox, ProcessError>;
}
