//! # SupervisorNode: leader election wrapped around a supervised service.
//!
//! One node per host. All nodes contend for the same key in a shared consensus store;
//! the winner runs the service, the others wait for the lease to lapse.
//!
//! ## State machine
//! ```text
//!               try_become_leader()
//!   Follower ───────────── Ok(lease) ─────────────► Leader
//!     ▲  │                                            │ LeaseRenewer ─┐ (concurrent,
//!     │  ├─ NotLeader    → sleep(retry + jitter)      │ ServiceSupervisor┘ term token)
//!     │  └─ Store(err)   → sleep(retry × 2^n ≤ max    │
//!     │                          + jitter)            │
//!     │                                               │
//!     ├──── lease lost: StepDownPolicy, back off ◄────┤
//!     │                                               │
//!   (exit) ◄── shutdown: kill service, revoke lease ◄─┘
//! ```
//!
//! ## Rules
//! - The renewal stream is the only leadership signal. The state flips to `Follower`
//!   in the same poll that observes the stream ending, before any teardown work.
//! - Losing leadership cancels the whole leader task tree through one child token.
//! - Shutdown as leader is graceful: the service is killed and the lease revoked so a
//!   peer can take over without waiting out the TTL.
//! - Node state lives in this value and the lease and process handle live in the term;
//!   nodes never share state except through the store.
//!
//! ## Event flow
//! ```text
//! Follower: ElectionAttempt → ElectionWon | ElectionContended | StoreUnavailable → ElectionBackoff
//! Leader:   ServiceStarting → ServiceRunning → ... → LeadershipLost | ShutdownRequested
//!           → ServiceStopped | ServiceDetached → SteppedDown
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{
        builder::NodeBuilder, election::ElectionCoordinator, health::HealthMonitor,
        renewer::LeaseRenewer, service::ServiceSupervisor, shutdown,
    },
    error::{ElectionError, LeaseLoss, RuntimeError},
    events::{Bus, Event, EventKind},
    policies::StepDownPolicy,
    probes::ProbeRef,
    process::{ProcessBox, ServiceRef},
    store::{LeaseId, StoreRef},
    subscribers::{Subscribe, SubscriberSet},
};

/// Role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Retrying the election.
    Follower,
    /// Holding the lease and running the service.
    Leader,
}

/// How a leadership term ended.
enum TermEnd {
    Lost,
    Shutdown,
}

/// What stopped the leader select loop.
enum Ended {
    Lost(LeaseLoss),
    Shutdown,
    /// The supervisor returned on its own; only possible once shutdown has begun.
    Stopped(Option<ProcessBox>),
}

/// A process-supervising cluster member.
pub struct SupervisorNode {
    pub(crate) cfg: Config,
    pub(crate) id: Arc<str>,
    pub(crate) store: StoreRef,
    pub(crate) election: ElectionCoordinator,
    pub(crate) service: ServiceRef,
    pub(crate) probe: Option<ProbeRef>,
    pub(crate) bus: Bus,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
    pub(crate) state: watch::Sender<NodeState>,
}

impl SupervisorNode {
    /// Starts building a node that contends through `store`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use leasevisor::{Config, LogWriter, MemoryStore, Subscribe, SupervisorNode};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let cfg = Config {
    ///         command: "my-daemon".into(),
    ///         ..Config::default()
    ///     };
    ///     let node = SupervisorNode::builder(cfg, Arc::new(MemoryStore::new()))
    ///         .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
    ///         .build()?;
    ///     node.run_until_signal().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn builder(cfg: Config, store: StoreRef) -> NodeBuilder {
        NodeBuilder::new(cfg, store)
    }

    /// Node id attached to every event and written into the lock record.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribes to role changes.
    pub fn state(&self) -> watch::Receiver<NodeState> {
        self.state.subscribe()
    }

    /// Event bus of this node.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the node until an OS termination signal arrives.
    ///
    /// # Errors
    /// [`RuntimeError::Signal`] if the signal handlers cannot be installed; the node is
    /// shut down in that case.
    pub async fn run_until_signal(self) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let id = Arc::clone(&self.id);
        let signal = async move {
            let res = shutdown::wait_for_shutdown_signal().await;
            if let Ok(name) = &res {
                tracing::info!(target: "leasevisor", node = %id, signal = *name, "termination signal received");
            }
            trigger.cancel();
            res.map(|_| ())
        };
        let (res, ()) = tokio::join!(signal, self.run(token));
        res.map_err(RuntimeError::Signal)
    }

    /// Runs the Follower/Leader state machine until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let listener = self.subscriber_listener();
        let election_backoff = self.cfg.election_backoff();
        let unavailable_backoff = self.cfg.unavailable_backoff();
        let mut attempt: u32 = 0;
        let mut unavailable_streak: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                self.publish(Event::new(EventKind::ShutdownRequested));
                break;
            }
            attempt = attempt.saturating_add(1);
            self.publish(Event::new(EventKind::ElectionAttempt).with_attempt(attempt));

            let delay = match self.election.try_become_leader().await {
                Ok(lease) => {
                    unavailable_streak = 0;
                    self.publish(
                        Event::new(EventKind::ElectionWon)
                            .with_lease(lease)
                            .with_attempt(attempt),
                    );
                    match self.lead(lease, &shutdown).await {
                        TermEnd::Shutdown => break,
                        TermEnd::Lost => election_backoff.next(0),
                    }
                }
                Err(ElectionError::NotLeader) => {
                    unavailable_streak = 0;
                    self.publish(Event::new(EventKind::ElectionContended).with_attempt(attempt));
                    election_backoff.next(0)
                }
                Err(ElectionError::Store(e)) => {
                    self.publish(
                        Event::new(EventKind::StoreUnavailable)
                            .with_attempt(attempt)
                            .with_reason(e.to_string()),
                    );
                    let delay = unavailable_backoff.next(unavailable_streak);
                    unavailable_streak = unavailable_streak.saturating_add(1);
                    delay
                }
            };

            self.publish(
                Event::new(EventKind::ElectionBackoff)
                    .with_delay(delay)
                    .with_attempt(attempt),
            );
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    self.publish(Event::new(EventKind::ShutdownRequested));
                    break;
                }
            }
        }

        if let Some((stop, handle)) = listener {
            stop.cancel();
            let _ = handle.await;
        }
    }

    /// Runs one leadership term.
    async fn lead(&self, lease: LeaseId, shutdown: &CancellationToken) -> TermEnd {
        self.state.send_replace(NodeState::Leader);

        let term = shutdown.child_token();
        let monitor = self.probe.clone().map(|probe| {
            HealthMonitor::new(probe, &self.cfg, self.bus.clone(), Arc::clone(&self.id))
        });
        let supervisor = ServiceSupervisor::new(
            Arc::clone(&self.service),
            monitor,
            self.cfg.restart_policy(),
            self.bus.clone(),
            Arc::clone(&self.id),
        );
        let renewer = LeaseRenewer::new(Arc::clone(&self.store), lease);

        let service = supervisor.run(term.clone());
        tokio::pin!(service);
        let renew = renewer.run();
        tokio::pin!(renew);

        let ended = tokio::select! {
            biased;
            loss = &mut renew => Ended::Lost(loss),
            _ = shutdown.cancelled() => Ended::Shutdown,
            process = &mut service => Ended::Stopped(process),
        };

        self.state.send_replace(NodeState::Follower);
        term.cancel();

        let (process, lost) = match ended {
            Ended::Stopped(process) => (process, None),
            Ended::Lost(loss) => (service.await, Some(loss)),
            Ended::Shutdown => (service.await, None),
        };

        match lost {
            Some(loss) => {
                self.publish(
                    Event::new(EventKind::LeadershipLost)
                        .with_lease(lease)
                        .with_reason(loss.to_string()),
                );
                match self.cfg.step_down {
                    StepDownPolicy::KillService => self.stop_process(process).await,
                    StepDownPolicy::LeaveRunning => {
                        if let Some(process) = process {
                            self.publish(
                                Event::new(EventKind::ServiceDetached)
                                    .with_source(self.service.name())
                                    .with_pid(process.id()),
                            );
                        }
                    }
                }
                self.publish(Event::new(EventKind::SteppedDown).with_lease(lease));
                TermEnd::Lost
            }
            None => {
                self.publish(Event::new(EventKind::ShutdownRequested).with_lease(lease));
                self.stop_process(process).await;
                if let Err(e) = self.store.revoke_lease(lease).await {
                    tracing::debug!(target: "leasevisor", node = %self.id, %lease, error = %e, "lease revoke on shutdown failed; it will expire");
                }
                self.publish(Event::new(EventKind::SteppedDown).with_lease(lease));
                TermEnd::Shutdown
            }
        }
    }

    /// Kills the process handed back by the supervisor.
    async fn stop_process(&self, process: Option<ProcessBox>) {
        let Some(mut process) = process else {
            return;
        };
        let pid = process.id();
        match process.kill().await {
            Ok(()) => self.publish(
                Event::new(EventKind::ServiceStopped)
                    .with_source(self.service.name())
                    .with_pid(pid),
            ),
            Err(e) => {
                tracing::warn!(target: "leasevisor", node = %self.id, pid, error = %e, "failed to stop service");
            }
        }
    }

    /// Forwards bus events to the subscriber set until the returned token is cancelled.
    ///
    /// Events still buffered at cancellation are delivered before the workers drain.
    fn subscriber_listener(&mut self) -> Option<(CancellationToken, JoinHandle<()>)> {
        if self.subscribers.is_empty() {
            return None;
        }
        let set = SubscriberSet::new(std::mem::take(&mut self.subscribers), self.bus.clone());
        let mut rx = self.bus.subscribe();
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stopped.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });
        Some((stop, handle))
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_node(Arc::clone(&self.id)));
    }
}
