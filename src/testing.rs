//! Scripted fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::{ProbeError, ProcessError};
use crate::events::Event;
use crate::probes::HealthProbe;
use crate::process::{ExitInfo, ProcessBox, Service, ServiceProcess};

/// Everything currently buffered in `rx`.
pub(crate) fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => out.push(ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return out,
        }
    }
}

/// How one spawned process behaves.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Script {
    /// Exits on its own after the delay.
    ExitAfter(Duration, i32),
    /// Runs until killed.
    RunForever,
    /// `spawn` itself fails.
    FailSpawn,
}

/// Service whose processes follow a per-spawn script.
pub(crate) struct ScriptedService {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    spawns: AtomicU32,
    kills: Arc<AtomicU32>,
    live: Arc<AtomicI32>,
}

impl ScriptedService {
    /// Uses `scripts` in order, then `fallback` for every later spawn.
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>, fallback: Script) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            fallback,
            spawns: AtomicU32::new(0),
            kills: Arc::new(AtomicU32::new(0)),
            live: Arc::new(AtomicI32::new(0)),
        })
    }

    pub(crate) fn forever() -> Arc<Self> {
        Self::new([], Script::RunForever)
    }

    /// Successful and failed spawn calls.
    pub(crate) fn spawns(&self) -> u32 {
        self.spawns.load(Ordering::SeqCst)
    }

    /// `kill` calls across all processes, including no-op ones.
    pub(crate) fn kills(&self) -> u32 {
        self.kills.load(Ordering::SeqCst)
    }

    /// Processes spawned and not yet exited or killed.
    pub(crate) fn live(&self) -> i32 {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for ScriptedService {
    fn name(&self) -> &str {
        "scripted-service"
    }

    async fn spawn(&self) -> Result<ProcessBox, ProcessError> {
        let n = self.spawns.fetch_add(1, Ordering::SeqCst) + 1;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        let exit_at = match script {
            Script::FailSpawn => {
                return Err(ProcessError::Spawn {
                    command: "scripted".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Script::ExitAfter(after, code) => Some((Instant::now() + after, code)),
            Script::RunForever => None,
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProcess {
            pid: 1000 + n,
            exit_at,
            done: None,
            kills: Arc::clone(&self.kills),
            live: Arc::clone(&self.live),
        }))
    }
}

/// Process handle produced by [`ScriptedService`].
pub(crate) struct FakeProcess {
    pid: u32,
    exit_at: Option<(Instant, i32)>,
    done: Option<ExitInfo>,
    kills: Arc<AtomicU32>,
    live: Arc<AtomicI32>,
}

impl FakeProcess {
    fn finish(&mut self, info: ExitInfo) -> ExitInfo {
        if self.done.is_none() {
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.done = Some(info);
        }
        self.done.unwrap_or(info)
    }
}

#[async_trait]
impl ServiceProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> Result<ExitInfo, ProcessError> {
        if let Some(info) = self.done {
            return Ok(info);
        }
        match self.exit_at {
            Some((at, code)) => {
                tokio::time::sleep_until(at).await;
                Ok(self.finish(ExitInfo::code(code)))
            }
            None => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.finish(ExitInfo {
            code: None,
            signal: Some(9),
        });
        Ok(())
    }
}

/// Probe answering from a script of healthy/unhealthy results.
pub(crate) struct ScriptedProbe {
    results: Mutex<VecDeque<bool>>,
    /// `None` hangs forever once the script is exhausted.
    fallback: Option<bool>,
    calls: AtomicU32,
}

impl ScriptedProbe {
    /// Plays `results` in order, then reports healthy.
    pub(crate) fn new(results: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Self::with_fallback(results, Some(true))
    }

    /// Fails `n` times, then reports healthy.
    pub(crate) fn failing_times(n: usize) -> Arc<Self> {
        Self::new(std::iter::repeat_n(false, n))
    }

    pub(crate) fn always_failing() -> Arc<Self> {
        Self::with_fallback([], Some(false))
    }

    /// Never answers.
    pub(crate) fn hanging() -> Arc<Self> {
        Self::with_fallback([], None)
    }

    fn with_fallback(results: impl IntoIterator<Item = bool>, fallback: Option<bool>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into_iter().collect()),
            fallback,
            calls: AtomicU32::new(0),
        })
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    fn name(&self) -> &str {
        "scripted-probe"
    }

    async fn check(&self, _timeout: Duration) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.results.lock().unwrap().pop_front().or(self.fallback);
        match next {
            Some(true) => Ok(()),
            Some(false) => Err(ProbeError::unhealthy("scripted failure")),
            None => std::future::pending().await,
        }
    }
}
