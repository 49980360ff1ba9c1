//! Three nodes contending for one `sleep` process on a shared in-memory store.
//!
//! The first leader is shut down gracefully after a few seconds and one of the
//! remaining nodes takes over immediately (the lease is revoked, not left to expire).
//!
//! ```text
//! RUST_LOG=leasevisor=debug cargo run --example three_nodes
//! ```

use std::sync::Arc;
use std::time::Duration;

use leasevisor::{
    Config, LogWriter, MemoryStore, NodeState, ProbeError, ProbeFn, ProbeRef, StoreRef, Subscribe,
    SupervisorNode,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leasevisor=info")),
        )
        .init();

    let store: StoreRef = Arc::new(MemoryStore::new());
    let mut nodes = Vec::new();

    for id in ["node-a", "node-b", "node-c"] {
        let cfg = Config {
            node_id: id.to_string(),
            command: "sleep".into(),
            args: vec!["3".into()],
            lease_ttl: Duration::from_secs(2),
            election_retry: Duration::from_millis(500),
            election_jitter: Duration::from_millis(250),
            probe_interval: Duration::from_secs(1),
            probe_timeout: Duration::from_millis(200),
            restart_backoff: Duration::from_millis(500),
            ..Config::default()
        };
        let probe: ProbeRef = ProbeFn::arc("always-ok", || async { Ok::<_, ProbeError>(()) });
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

        let node = SupervisorNode::builder(cfg, Arc::clone(&store))
            .with_probe(probe)
            .with_subscribers(subs)
            .build()?;
        let state = node.state();
        let token = CancellationToken::new();
        let task = tokio::spawn(node.run(token.clone()));
        nodes.push((id, state, token, task));
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    if let Some((id, _, token, _)) = nodes
        .iter()
        .find(|(_, state, _, _)| *state.borrow() == NodeState::Leader)
    {
        tracing::info!(leader = *id, "stopping the current leader");
        token.cancel();
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    for (id, state, token, task) in nodes {
        let current = *state.borrow();
        tracing::info!(node = id, state = ?current, "stopping");
        token.cancel();
        task.await?;
    }
    Ok(())
}
