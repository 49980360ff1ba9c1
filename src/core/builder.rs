use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    config::Config,
    core::{election::ElectionCoordinator, node::NodeState, node::SupervisorNode},
    error::ConfigError,
    events::Bus,
    probes::ProbeRef,
    process::{CommandService, ServiceRef},
    store::StoreRef,
    subscribers::Subscribe,
};

/// Builder for a [`SupervisorNode`].
///
/// Obtained from [`SupervisorNode::builder`].
pub struct NodeBuilder {
    cfg: Config,
    store: StoreRef,
    service: Option<ServiceRef>,
    probe: Option<ProbeRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl NodeBuilder {
    pub(crate) fn new(cfg: Config, store: StoreRef) -> Self {
        Self {
            cfg,
            store,
            service: None,
            probe: None,
            subscribers: Vec::new(),
        }
    }

    /// Supervises a custom service instead of `config.command`.
    pub fn with_service(mut self, service: ServiceRef) -> Self {
        self.service = Some(service);
        self
    }

    /// Enables health probing. Without a probe only process exit triggers restarts.
    pub fn with_probe(mut self, probe: ProbeRef) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (election, leadership, service lifecycle)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the configuration and assembles the node.
    ///
    /// Nothing is spawned here; subscriber workers start with [`SupervisorNode::run`].
    ///
    /// # Errors
    /// Any [`Config::validate`] failure, or [`ConfigError::MissingCommand`] when no
    /// service was supplied and `config.command` is empty.
    pub fn build(self) -> Result<SupervisorNode, ConfigError> {
        self.cfg.validate()?;
        let service = match self.service {
            Some(service) => service,
            None => Arc::new(CommandService::from_config(&self.cfg)?),
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let election = ElectionCoordinator::from_config(Arc::clone(&self.store), &self.cfg);
        let (state, _rx) = watch::channel(NodeState::Follower);

        Ok(SupervisorNode {
            id: Arc::from(self.cfg.node_id.as_str()),
            cfg: self.cfg,
            store: self.store,
            election,
            service,
            probe: self.probe,
            bus,
            subscribers: self.subscribers,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::ScriptedService;

    fn store() -> StoreRef {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn missing_command_without_service_is_rejected() {
        let res = SupervisorNode::builder(Config::default(), store()).build();
        assert!(matches!(res, Err(ConfigError::MissingCommand)));
    }

    #[test]
    fn invalid_config_is_rejected_before_anything_else() {
        let cfg = Config {
            lock_key: String::new(),
            ..Config::default()
        };
        let res = SupervisorNode::builder(cfg, store())
            .with_service(ScriptedService::forever())
            .build();
        assert!(matches!(res, Err(ConfigError::EmptyLockKey)));
    }

    #[test]
    fn command_from_config_is_enough() {
        let cfg = Config {
            node_id: "n1".into(),
            command: "sleep".into(),
            args: vec!["60".into()],
            ..Config::default()
        };
        let node = SupervisorNode::builder(cfg, store()).build().unwrap();
        assert_eq!(node.id(), "n1");
        assert_eq!(*node.state().borrow(), NodeState::Follower);
    }
}
