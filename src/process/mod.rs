//! # Managed process.
//!
//! - [`Service`] / [`ServiceProcess`] the spawn/wait/kill interface the supervisor owns
//! - [`CommandService`] / [`ChildProcess`] OS-process implementation on `tokio::process`

mod command;
mod service;

pub use command::{ChildProcess, CommandService};
pub use service::{ExitInfo, ProcessBox, Service, ServiceProcess, ServiceRef};
