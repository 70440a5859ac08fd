//! Dirdex service front, client and daemon lifecycle
//!
//! Shared between the `dirdex` binary and the integration tests.

pub mod config;
pub mod daemon;
pub mod ipc;
pub mod locks;
pub mod protocol;

pub use config::{Config, ConfigOverrides};
pub use daemon::Daemon;
pub use ipc::{ClientError, IpcClient, IpcServer};
