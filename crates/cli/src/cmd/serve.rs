//! Start the dirdex server

use anyhow::{Context, Result};
use cli_lib::config::{state_dir, Config};
use cli_lib::locks::DaemonLock;
use cli_lib::Daemon;
use owo_colors::OwoColorize;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// How long a detached server gets to take its lock
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config: Config, daemon: bool) -> Result<()> {
    config.validate()?;

    if daemon {
        start_background(&config).await
    } else {
        run_foreground(config).await
    }
}

async fn run_foreground(config: Config) -> Result<()> {
    let lock = DaemonLock::acquire(&state_dir(), config.port)?;

    let daemon = Daemon::start(config).await?;
    let result = daemon.run_until_shutdown().await;

    lock.release()?;
    result
}

async fn start_background(config: &Config) -> Result<()> {
    let state_dir = state_dir();
    std::fs::create_dir_all(&state_dir).context("Failed to create state directory")?;
    let log_file = state_dir.join(format!("daemon-{}.log", config.port));

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    // Same invocation minus the detach flag
    let args: Vec<String> = std::env::args()
        .skip(1)
        .filter(|arg| arg != "--daemon" && arg != "-d")
        .collect();

    let log_file_writer = std::fs::File::create(&log_file).context("Failed to create log file")?;

    let mut child = Command::new("nohup")
        .arg(&exe)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(log_file_writer.try_clone()?)
        .stderr(log_file_writer)
        .spawn()
        .context("Failed to spawn daemon process")?;

    let started = Instant::now();
    while started.elapsed() < STARTUP_TIMEOUT {
        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Some(status) = child.try_wait()? {
            anyhow::bail!(
                "Daemon exited during startup ({}), check logs at {}",
                status,
                log_file.display()
            );
        }
        if let Some(lock) = DaemonLock::running(&state_dir, config.port) {
            println!(
                "{} Started dirdex in daemon mode with pid {}",
                "✓".green(),
                lock.pid
            );
            println!("Logs: {}", log_file.display().dimmed());
            return Ok(());
        }
    }

    anyhow::bail!(
        "Daemon did not come up within {:?} (check logs at {})",
        STARTUP_TIMEOUT,
        log_file.display()
    )
}
