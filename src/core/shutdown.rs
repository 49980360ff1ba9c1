//! # Termination signals for [`SupervisorNode::run_until_signal`](crate::SupervisorNode::run_until_signal).
//!
//! Resolves with the name of the first signal received:
//! - Unix: `SIGINT`, `SIGTERM` (systemd, Kubernetes), `SIGQUIT`
//! - elsewhere: Ctrl-C
//!
//! Fails only if the handlers cannot be registered.

#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
