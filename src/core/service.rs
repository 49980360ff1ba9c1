//! # ServiceSupervisor: keeps the managed process alive while this node leads.
//!
//! Drives one [`Service`] through a restart cycle for the duration of a leadership term.
//!
//! ## State machine
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!        Starting ── spawn ok ──► Running ── exit ────────► Restarting
//!            │                      │    └── probe threshold ─►│  kill (idempotent)
//!            └── spawn err ─────────┼─────────────────────────►│  sleep(restart_backoff)
//!                                   │                          │
//!   stop token cancelled (any state)▼                          │
//!                                Stopped ◄─────────────────────┘
//! ```
//!
//! ## Rules
//! - In `Running`, process exit and the health threshold race through [`first_completed`];
//!   exactly one of them can trigger the restart, the other is dropped.
//! - Every spawn gets a fresh [`HealthMonitor`] run, so the failure counter starts at 0.
//! - The process handle is owned by exactly one state at a time. On stop it is handed back
//!   to the caller, who decides its fate (see [`StepDownPolicy`](crate::StepDownPolicy)).
//! - Spawn failures are reported and retried after the restart backoff, never fatal.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        health::{HealthMonitor, ThresholdReached},
        race::{Race, first_completed},
    },
    events::{Bus, Event, EventKind, RestartCause},
    policies::BackoffPolicy,
    process::{ProcessBox, ServiceRef},
};

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Spawning the process.
    Starting,
    /// Process alive and monitored.
    Running,
    /// Process killed, waiting out the restart backoff.
    Restarting,
    /// Supervisor finished; no further spawns.
    Stopped,
}

/// Restart loop for one managed service.
pub struct ServiceSupervisor {
    service: ServiceRef,
    name: Arc<str>,
    monitor: Option<HealthMonitor>,
    restart: BackoffPolicy,
    bus: Bus,
    node: Arc<str>,
    state: watch::Sender<ServiceState>,
}

impl ServiceSupervisor {
    /// Creates a supervisor. Without a monitor only process exit triggers restarts.
    pub fn new(
        service: ServiceRef,
        monitor: Option<HealthMonitor>,
        restart: BackoffPolicy,
        bus: Bus,
        node: Arc<str>,
    ) -> Self {
        let (state, _rx) = watch::channel(ServiceState::Starting);
        let name = Arc::from(service.name());
        Self {
            service,
            name,
            monitor,
            restart,
            bus,
            node,
            state,
        }
    }

    /// Subscribes to state changes.
    pub fn state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Runs the restart cycle until `stop` is cancelled.
    ///
    /// Returns the process that was running at that moment, if any. The caller owns it
    /// from then on: it is neither killed nor awaited here.
    pub async fn run(self, stop: CancellationToken) -> Option<ProcessBox> {
        let mut attempt: u32 = 0;

        loop {
            if stop.is_cancelled() {
                break;
            }
            attempt = attempt.saturating_add(1);
            self.state.send_replace(ServiceState::Starting);
            self.publish(Event::new(EventKind::ServiceStarting).with_attempt(attempt));

            let mut process = match self.service.spawn().await {
                Ok(p) => p,
                Err(e) => {
                    self.publish(
                        Event::new(EventKind::ServiceSpawnFailed)
                            .with_attempt(attempt)
                            .with_reason(e.to_string()),
                    );
                    if self.restart_after(RestartCause::SpawnFailed, attempt, &stop).await {
                        continue;
                    }
                    break;
                }
            };

            let pid = process.id();
            self.state.send_replace(ServiceState::Running);
            self.publish(
                Event::new(EventKind::ServiceRunning)
                    .with_pid(pid)
                    .with_attempt(attempt),
            );

            let outcome = {
                let health = self.health_failure();
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => None,
                    race = first_completed(process.wait(), health) => Some(race),
                }
            };

            let cause = match outcome {
                None => {
                    self.state.send_replace(ServiceState::Stopped);
                    return Some(process);
                }
                Some(Race::First(Ok(exit))) => {
                    self.publish(
                        Event::new(EventKind::ServiceExited)
                            .with_pid(pid)
                            .with_exit_code(exit.code)
                            .with_reason(exit.to_string()),
                    );
                    RestartCause::Exited
                }
                Some(Race::First(Err(e))) => {
                    self.publish(
                        Event::new(EventKind::ServiceExited)
                            .with_pid(pid)
                            .with_reason(e.to_string()),
                    );
                    RestartCause::Exited
                }
                Some(Race::Second(ThresholdReached { .. })) => RestartCause::ProbeThreshold,
            };

            self.state.send_replace(ServiceState::Restarting);
            if let Err(e) = process.kill().await {
                tracing::warn!(target: "leasevisor", node = %self.node, pid, error = %e, "kill before restart failed");
            }
            drop(process);

            if !self.restart_after(cause, attempt, &stop).await {
                break;
            }
        }

        self.state.send_replace(ServiceState::Stopped);
        None
    }

    /// Resolves when the health monitor gives up; never resolves without a monitor.
    async fn health_failure(&self) -> ThresholdReached {
        match &self.monitor {
            Some(monitor) => monitor.run().await,
            None => std::future::pending().await,
        }
    }

    /// Publishes the restart and sleeps the backoff. Returns `false` if stopped meanwhile.
    async fn restart_after(
        &self,
        cause: RestartCause,
        attempt: u32,
        stop: &CancellationToken,
    ) -> bool {
        self.state.send_replace(ServiceState::Restarting);
        let delay = self.restart.next(attempt.saturating_sub(1));
        self.publish(
            Event::new(EventKind::ServiceRestarting)
                .with_restart_cause(cause)
                .with_delay(delay)
                .with_attempt(attempt),
        );

        tokio::select! {
            _ = time::sleep(delay) => true,
            _ = stop.cancelled() => false,
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(
            ev.with_node(Arc::clone(&self.node))
                .with_source(Arc::clone(&self.name)),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::probes::ProbeRef;
    use crate::testing::{Script, ScriptedProbe, ScriptedService, drain};

    struct Harness {
        bus: Bus,
        rx: tokio::sync::broadcast::Receiver<Event>,
        stop: CancellationToken,
    }

    impl Harness {
        fn new() -> Self {
            let bus = Bus::new(256);
            let rx = bus.subscribe();
            Self {
                bus,
                rx,
                stop: CancellationToken::new(),
            }
        }

        fn supervisor(
            &self,
            service: Arc<ScriptedService>,
            probe: Option<ProbeRef>,
        ) -> ServiceSupervisor {
            let cfg = Config::default();
            let node: Arc<str> = Arc::from("n1");
            let monitor =
                probe.map(|p| HealthMonitor::new(p, &cfg, self.bus.clone(), Arc::clone(&node)));
            ServiceSupervisor::new(service, monitor, cfg.restart_policy(), self.bus.clone(), node)
        }

        fn restarts(&mut self) -> Vec<RestartCause> {
            drain(&mut self.rx)
                .into_iter()
                .filter(|e| e.kind == EventKind::ServiceRestarting)
                .filter_map(|e| e.restart_cause)
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_probe_failures_cause_exactly_one_restart() {
        let mut h = Harness::new();
        let service = ScriptedService::forever();
        let probe = ScriptedProbe::always_failing();
        let sup = h.supervisor(service.clone(), Some(probe.clone() as ProbeRef));
        let task = tokio::spawn(sup.run(h.stop.clone()));

        // failures at 10s, 20s, 30s; restart backoff runs until 32s
        time::sleep(Duration::from_secs(31)).await;

        assert_eq!(h.restarts(), vec![RestartCause::ProbeThreshold]);
        assert_eq!(probe.calls(), 3);
        assert_eq!(service.spawns(), 1);
        assert_eq!(service.kills(), 1);
        assert_eq!(service.live(), 0);

        h.stop.cancel();
        assert!(task.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_then_success_never_restart() {
        let mut h = Harness::new();
        let service = ScriptedService::forever();
        let probe = ScriptedProbe::new([false, false, true, false, false]);
        let sup = h.supervisor(service.clone(), Some(probe.clone() as ProbeRef));
        let task = tokio::spawn(sup.run(h.stop.clone()));

        time::sleep(Duration::from_secs(75)).await;

        assert!(h.restarts().is_empty());
        assert_eq!(probe.calls(), 7);
        assert_eq!(service.spawns(), 1);

        h.stop.cancel();
        let process = task.await.unwrap();
        assert_eq!(process.and_then(|p| p.id()), Some(1001));
        assert_eq!(service.kills(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn process_exit_restarts_once_and_cancels_health_branch() {
        let mut h = Harness::new();
        let service = ScriptedService::new(
            [Script::ExitAfter(Duration::from_secs(1), 0)],
            Script::RunForever,
        );
        let probe = ScriptedProbe::always_failing();
        let sup = h.supervisor(service.clone(), Some(probe.clone() as ProbeRef));
        let task = tokio::spawn(sup.run(h.stop.clone()));

        // exit at 1s, respawn at 3s, next probe not before 13s
        time::sleep(Duration::from_secs(5)).await;

        let events = drain(&mut h.rx);
        let restarts: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::ServiceRestarting)
            .collect();
        assert_eq!(restarts.len(), 1);
        assert_eq!(restarts[0].restart_cause, Some(RestartCause::Exited));
        assert!(
            events
                .iter()
                .all(|e| e.kind != EventKind::ProbeThresholdReached)
        );
        let exited = events
            .iter()
            .find(|e| e.kind == EventKind::ServiceExited)
            .unwrap();
        assert_eq!(exited.exit_code, Some(0));
        assert_eq!(probe.calls(), 0);
        assert_eq!(service.spawns(), 2);
        // kill on the already-exited handle is a no-op that still returns
        assert_eq!(service.kills(), 1);
        assert_eq!(service.live(), 1);

        h.stop.cancel();
        assert!(task.await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn exit_mid_failure_streak_restarts_once_with_a_fresh_counter() {
        let mut h = Harness::new();
        let service = ScriptedService::new(
            [Script::ExitAfter(Duration::from_secs(25), 0)],
            Script::RunForever,
        );
        let probe = ScriptedProbe::always_failing();
        let sup = h.supervisor(service.clone(), Some(probe.clone() as ProbeRef));
        let task = tokio::spawn(sup.run(h.stop.clone()));

        // failures at 10s and 20s, exit at 25s, respawn at 27s, then failures at 37s and 47s
        time::sleep(Duration::from_secs(50)).await;

        let events = drain(&mut h.rx);
        let restarts: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::ServiceRestarting)
            .filter_map(|e| e.restart_cause)
            .collect();
        assert_eq!(restarts, vec![RestartCause::Exited]);
        assert!(
            events
                .iter()
                .all(|e| e.kind != EventKind::ProbeThresholdReached)
        );
        let failures: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::ProbeFailed)
            .map(|e| e.failures)
            .collect();
        assert_eq!(failures, vec![Some(1), Some(2), Some(1), Some(2)]);
        assert_eq!(probe.calls(), 4);
        assert_eq!(service.spawns(), 2);

        time::sleep(Duration::from_secs(6)).await;
        assert!(h.restarts().is_empty());

        // third failure of the second process lands at 57s
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.restarts(), vec![RestartCause::ProbeThreshold]);
        assert_eq!(probe.calls(), 5);

        h.stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn events_carry_service_and_health_check_names() {
        let mut h = Harness::new();
        let service = ScriptedService::forever();
        let probe = ScriptedProbe::new([false, true]);
        let sup = h.supervisor(service.clone(), Some(probe.clone() as ProbeRef));
        let task = tokio::spawn(sup.run(h.stop.clone()));

        time::sleep(Duration::from_secs(25)).await;

        let events = drain(&mut h.rx);
        let source_of = |kind: EventKind| {
            events
                .iter()
                .find(|e| e.kind == kind)
                .and_then(|e| e.source.as_deref().map(str::to_owned))
        };
        assert_eq!(source_of(EventKind::ServiceStarting).as_deref(), Some("scripted-service"));
        assert_eq!(source_of(EventKind::ServiceRunning).as_deref(), Some("scripted-service"));
        assert_eq!(source_of(EventKind::ProbeFailed).as_deref(), Some("scripted-probe"));
        assert_eq!(source_of(EventKind::ProbeRecovered).as_deref(), Some("scripted-probe"));
        assert!(events.iter().all(|e| e.node.as_deref() == Some("n1")));

        h.stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_is_retried_after_backoff() {
        let mut h = Harness::new();
        let service = ScriptedService::new([Script::FailSpawn], Script::RunForever);
        let sup = h.supervisor(service.clone(), None);
        let mut state = sup.state();
        let task = tokio::spawn(sup.run(h.stop.clone()));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*state.borrow_and_update(), ServiceState::Restarting);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*state.borrow_and_update(), ServiceState::Running);

        let kinds: Vec<_> = drain(&mut h.rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ServiceStarting,
                EventKind::ServiceSpawnFailed,
                EventKind::ServiceRestarting,
                EventKind::ServiceStarting,
                EventKind::ServiceRunning,
            ]
        );
        assert_eq!(service.spawns(), 2);

        h.stop.cancel();
        task.await.unwrap();
        assert_eq!(*state.borrow(), ServiceState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_backoff_ends_without_respawn() {
        let h = Harness::new();
        let service = ScriptedService::new(
            [Script::ExitAfter(Duration::from_millis(10), 1)],
            Script::RunForever,
        );
        let sup = h.supervisor(service.clone(), None);
        let task = tokio::spawn(sup.run(h.stop.clone()));

        time::sleep(Duration::from_secs(1)).await;
        h.stop.cancel();

        assert!(task.await.unwrap().is_none());
        assert_eq!(service.spawns(), 1);
    }
}
