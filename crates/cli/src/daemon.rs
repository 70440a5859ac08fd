//! Daemon lifecycle management
//!
//! Startup order:
//! 1. bind the listener (fails fast when the port is taken)
//! 2. run the first index pass to completion
//! 3. spawn the periodic re-indexer and the history ingest loop
//! 4. accept queries until shutdown

use crate::config::Config;
use crate::ipc::IpcServer;
use anyhow::{Context, Result};
use dirdex_core::{HistoryIngestor, Indexer, SkipList, Store};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use watcher::{run_ingest_loop, run_pass, HistoryTailer, PeriodicIndexer};

/// A started daemon: index built, background tasks running, listener bound
pub struct Daemon {
    store: Arc<Store>,
    server: IpcServer,
    tasks: Vec<JoinHandle<()>>,
}

impl Daemon {
    /// Build the index and start background work. Queries are not accepted
    /// until [`Daemon::serve_until`] runs.
    pub async fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(Store::new());
        let server = IpcServer::bind(config.port, Arc::clone(&store)).await?;

        let skip = SkipList::new(config.skip_list.iter().cloned());
        let indexer = Indexer::new(Arc::clone(&store), config.root(), skip.clone());
        let stats = run_pass(&indexer)
            .await
            .context("Initial index pass failed")?;
        info!(
            "Indexed {} directories under {}",
            stats.seen,
            config.root().display()
        );

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(
            PeriodicIndexer::new(indexer, config.dir_interval).run(),
        ));

        info!("Launching history watcher for {}", config.hist_file.display());
        let tail = HistoryTailer::new(&config.hist_file, config.monitor_interval).spawn();
        let ingestor = HistoryIngestor::new(Arc::clone(&store), &config.home, skip);
        tasks.push(tokio::spawn(async move {
            run_ingest_loop(ingestor, tail).await;
        }));

        Ok(Self {
            store,
            server,
            tasks,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Serve until `shutdown` completes, then stop background tasks
    pub async fn serve_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let result = self.server.serve(shutdown).await;
        for task in &self.tasks {
            task.abort();
        }
        info!("Daemon stopped");
        result
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn run_until_shutdown(self) -> Result<()> {
        self.serve_until(shutdown_signal()).await
    }
}

/// Completes on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = ctrl_c.await;
        }
    }
    info!("Shutdown signal received");
}
