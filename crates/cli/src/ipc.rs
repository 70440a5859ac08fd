//! IPC between CLI and daemon
//!
//! Line-delimited JSON over a loopback TCP socket; see [`crate::protocol`].

use crate::protocol::{Dlist, ErrorKind, ProtocolError, Request, Response};
use anyhow::{Context, Result};
use dirdex_core::{ResolveError, Resolution, Store};
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("There is no server listening on {addr}")]
    NotRunning { addr: SocketAddr },
    #[error("connection to daemon failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("daemon closed the connection")]
    Closed,
    #[error("daemon error: {0}")]
    Remote(String),
}

/// IPC client for communicating with daemon
pub struct IpcClient {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl IpcClient {
    /// Connect to a daemon on the loopback interface
    pub async fn connect(port: u16) -> Result<Self, ClientError> {
        Self::connect_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await
    }

    pub async fn connect_addr(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(|e| match e.kind() {
            io::ErrorKind::ConnectionRefused => ClientError::NotRunning { addr },
            _ => ClientError::Io(e),
        })?;

        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half).lines(),
            writer,
        })
    }

    /// Send a message to daemon and wait for its reply
    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.writer.write_all(request.to_line()?.as_bytes()).await?;

        let line = self.reader.next_line().await?.ok_or(ClientError::Closed)?;
        Ok(Response::from_line(&line)?)
    }

    /// Resolve `name`. "No match" is an empty list, not an error.
    pub async fn get(&mut self, name: &str) -> Result<Vec<Resolution>, ClientError> {
        let request = Request::Get {
            name: name.to_string(),
        };

        match self.send(&request).await? {
            Response::Dlist(dlist) => Ok(dlist.decode()?),
            Response::Error {
                kind: ErrorKind::NotFound,
                ..
            } => Ok(Vec::new()),
            Response::Error {
                kind: ErrorKind::Internal,
                message,
            } => Err(ClientError::Remote(message)),
        }
    }
}

/// IPC server for daemon
pub struct IpcServer {
    listener: TcpListener,
    store: Arc<Store>,
}

impl IpcServer {
    /// Bind the loopback listener. Port 0 picks a free port.
    pub async fn bind(port: u16, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .with_context(|| format!("Failed to listen on port {}", port))?;
        Ok(Self { listener, store })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` completes
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            let store = Arc::clone(&self.store);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, store).await {
                                    debug!("Connection from {} ended: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                }
            }
        }
    }

    /// Handle one request against the store
    pub fn handle_message(store: &Store, request: Request) -> Response {
        match request {
            Request::Get { name } => match store.resolve(&name) {
                Ok(results) => Response::Dlist(Dlist::encode(&results)),
                Err(e @ ResolveError::NotFound { .. }) => {
                    debug!("{}", e);
                    Response::Error {
                        kind: ErrorKind::NotFound,
                        message: e.to_string(),
                    }
                }
            },
        }
    }
}

async fn handle_connection(stream: TcpStream, store: Arc<Store>) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match Request::from_line(&line) {
            Ok(request) => IpcServer::handle_message(&store, request),
            Err(e) => Response::Error {
                kind: ErrorKind::Internal,
                message: e.to_string(),
            },
        };
        writer.write_all(response.to_line()?.as_bytes()).await?;
    }

    Ok(())
}
