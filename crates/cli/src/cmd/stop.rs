//! Stop the dirdex server

use anyhow::Result;
use cli_lib::config::state_dir;
use cli_lib::locks::{self, DaemonLock};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(port: u16) -> Result<()> {
    let lock_dir = state_dir();

    let Some(owner) = DaemonLock::running(&lock_dir, port) else {
        println!("{}", format!("No dirdex server running on port {}", port).dimmed());
        return Ok(());
    };

    locks::terminate(owner.pid)?;

    let started = Instant::now();
    while started.elapsed() < STOP_TIMEOUT {
        // The lock goes away once the server has released it
        if DaemonLock::running(&lock_dir, port).is_none() {
            println!("{} Stopped dirdex (pid {})", "✓".green(), owner.pid);
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server (pid {}) did not stop within {:?}", owner.pid, STOP_TIMEOUT)
}
