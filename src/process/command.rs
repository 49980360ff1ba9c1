//! # OS process backed service.
//!
//! [`CommandService`] spawns `program args...` with `tokio::process::Command`:
//! stdin is closed, stdout/stderr are inherited. Handles are created without
//! `kill_on_drop` so that dropping a [`ChildProcess`] leaves the process running;
//! the supervisor kills explicitly when it means to.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::config::Config;
use crate::error::{ConfigError, ProcessError};
use crate::process::service::{ExitInfo, ProcessBox, Service, ServiceProcess};

/// Launches the managed program.
#[derive(Clone, Debug)]
pub struct CommandService {
    program: String,
    args: Vec<String>,
}

impl CommandService {
    /// Creates a service running `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the service from `config.command` / `config.args`.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        if cfg.command.is_empty() {
            return Err(ConfigError::MissingCommand);
        }
        Ok(Self::new(cfg.command.clone(), cfg.args.clone()))
    }
}

#[async_trait]
impl Service for CommandService {
    fn name(&self) -> &str {
        &self.program
    }

    async fn spawn(&self) -> Result<ProcessBox, ProcessError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: self.program.clone(),
                source,
            })?;
        Ok(Box::new(ChildProcess { child }))
    }
}

/// Handle to a spawned OS process.
pub struct ChildProcess {
    child: Child,
}

#[async_trait]
impl ServiceProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<ExitInfo, ProcessError> {
        self.child
            .wait()
            .await
            .map(ExitInfo::from)
            .map_err(ProcessError::Wait)
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        match self.child.start_kill() {
            Ok(()) => {}
            // already reaped
            Err(e) if e.kind() == ErrorKind::InvalidInput => return Ok(()),
            Err(e) => return Err(ProcessError::Kill(e)),
        }
        self.child.wait().await.map_err(ProcessError::Wait)?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn reports_exit_code() {
        let svc = CommandService::new("sh", ["-c", "exit 3"]);
        let mut proc = svc.spawn().await.unwrap();
        assert!(proc.id().is_some());
        assert_eq!(proc.wait().await.unwrap(), ExitInfo::code(3));
    }

    #[tokio::test]
    async fn kill_after_exit_is_a_quick_no_op() {
        let svc = CommandService::new("true", Vec::<String>::new());
        let mut proc = svc.spawn().await.unwrap();
        proc.wait().await.unwrap();

        let res = tokio::time::timeout(Duration::from_secs(1), proc.kill()).await;
        assert!(matches!(res, Ok(Ok(()))));
        let res = tokio::time::timeout(Duration::from_secs(1), proc.kill()).await;
        assert!(matches!(res, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn kill_terminates_running_process() {
        let svc = CommandService::new("sleep", ["30"]);
        let mut proc = svc.spawn().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), proc.kill())
            .await
            .unwrap()
            .unwrap();
        let exit = proc.wait().await.unwrap();
        assert_eq!(exit.signal, Some(9));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let svc = CommandService::new("/definitely/not/here", Vec::<String>::new());
        let err = svc.spawn().await.err().unwrap();
        assert_eq!(err.as_label(), "process_spawn_failed");
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandService::from_config(&Config::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingCommand);
    }
}
