use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{Instrument, error, info, info_span};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::server::pool::WorkerPool;

/// Pause after a failed accept, e.g. when the process is out of descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The listening socket plus the pool that serves what it accepts.
pub struct Listener {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    pool: WorkerPool,
}

impl Listener {
    /// Binds the configured address with the configured backlog.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = resolve_addr(&config.listen_addr()).await?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("cannot bind {}", addr))?;
        let listener = socket.listen(config.backlog)?;

        info!(
            "Listening on {} (workers: {}, root: {})",
            listener.local_addr()?,
            config.workers,
            config.document_root.display()
        );

        Ok(Self {
            listener,
            pool: WorkerPool::new(config.workers),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Accepts connections forever, one worker per connection.
    ///
    /// Nothing that happens on a single connection ends this loop.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let worker = self.pool.reserve().await?;

            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let config = Arc::clone(&self.config);
            worker.spawn(
                async move {
                    let mut conn = Connection::new(socket, config);
                    if let Err(e) = conn.run().await {
                        error!("Connection error from {}: {}", peer, e);
                    }
                }
                .instrument(info_span!("conn", %peer)),
            );
        }
    }
}

pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    Listener::bind(cfg).await?.run().await
}

/// First IPv4 address `addr` resolves to, or any address if there is none.
async fn resolve_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    let candidates: Vec<SocketAddr> = tokio::net::lookup_host(addr)
        .await
        .with_context(|| format!("cannot resolve {}", addr))?
        .collect();

    candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .with_context(|| format!("{} did not resolve to any address", addr))
}
