//! Common utilities for integration tests

#![allow(dead_code)]

pub mod cli;

use anyhow::Result;
use cli_lib::{Config, Daemon, IpcClient};
use dirdex_core::Resolution;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const HOME: &str = "/this/home";

/// Directory tree used by most scenarios
pub const TREE: &[&str] = &["top/next/last", "foo", "ignore/inner", "rand/next", "next"];

/// A temporary root with a history file next to it
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    pub fn new(dirs: &[&str]) -> Result<Self> {
        let dir = TempDir::new()?;
        std::fs::create_dir(dir.path().join("root"))?;
        for rel in dirs {
            std::fs::create_dir_all(dir.path().join("root").join(rel))?;
        }
        std::fs::write(dir.path().join("histfile"), "")?;
        Ok(Self { dir })
    }

    pub fn standard() -> Result<Self> {
        Self::new(TREE)
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn hist_file(&self) -> PathBuf {
        self.dir.path().join("histfile")
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn append_history(&self, lines: &str) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(self.hist_file())?;
        file.write_all(lines.as_bytes())?;
        Ok(())
    }

    /// Config on a free port with fast polling
    pub fn config(&self) -> Config {
        Config {
            port: 0,
            root: Some(self.root()),
            skip_list: vec!["ignore".to_string()],
            hist_file: self.hist_file(),
            home: PathBuf::from(HOME),
            monitor_interval: Duration::from_millis(50),
            dir_interval: Duration::from_secs(3600),
        }
    }
}

/// An in-process daemon serving on a loopback port
pub struct RunningDaemon {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl RunningDaemon {
    pub async fn start(config: Config) -> Result<Self> {
        let daemon = Daemon::start(config).await?;
        let addr = daemon.local_addr()?;
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(daemon.serve_until(async {
            let _ = stopped.await;
        }));
        Ok(Self {
            addr,
            stop: Some(stop),
            task,
        })
    }

    pub async fn get(&self, name: &str) -> Result<Vec<Resolution>> {
        let mut client = IpcClient::connect_addr(self.addr).await?;
        Ok(client.get(name).await?)
    }

    /// Query `name` until `check` accepts the results or `timeout` elapses
    pub async fn wait_until<F>(&self, name: &str, timeout: Duration, mut check: F) -> bool
    where
        F: FnMut(&[Resolution]) -> bool,
    {
        let started = Instant::now();
        while started.elapsed() < timeout {
            if let Ok(results) = self.get(name).await {
                if check(&results) {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await?
    }
}

pub fn exact(path: impl Into<PathBuf>) -> Resolution {
    Resolution::Exact(path.into())
}
