//! TCP listener and lifecycle
//!
//! The server accepts clients until shutdown is requested, runs every
//! connection and the timestamp writer on a [`TaskTracker`], then waits for
//! them all before tearing the log down.

use std::future::Future;
use std::net::SocketAddr;

use aesd_log::SharedLog;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::timestamp::TimestampTask;

/// A bound socket server over one shared log
pub struct Server {
    listener: TcpListener,
    log: SharedLog,
    config: ServerConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Server {
    /// Bind the listener and create a fresh log from `config.store`
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let log = SharedLog::new(config.store.clone())?;
        Self::bind_with_log(config, log).await
    }

    /// Bind the listener over an existing log
    pub async fn bind_with_log(config: ServerConfig, log: SharedLog) -> ServerResult<Self> {
        let addr = config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!(addr = %listener.local_addr()?, capacity = log.capacity(), "Listening");

        Ok(Self {
            listener,
            log,
            config,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until a SIGINT or SIGTERM arrives
    pub async fn run(self) -> ServerResult<usize> {
        self.run_until(shutdown_signal()).await
    }

    /// Accept clients until `shutdown` resolves or the shutdown token fires.
    ///
    /// Returns the number of entries released at teardown.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> ServerResult<usize> {
        if let Some(interval) = self.config.timestamp_interval() {
            TimestampTask::new(self.log.clone(), interval, self.cancel.clone())
                .spawn(&self.tracker);
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Caught signal, exiting");
                    break;
                }
                _ = self.cancel.cancelled() => {
                    info!("Shutdown requested, exiting");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => warn!(error = %e, "Accept failed"),
                },
            }
        }

        drop(self.listener);
        self.cancel.cancel();
        self.tracker.close();
        debug!(tasks = self.tracker.len(), "Waiting for tasks");
        self.tracker.wait().await;

        let released = self.log.teardown();
        info!(released, "Log torn down");
        Ok(released)
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let connection = Connection::new(stream, peer, self.log.clone(), self.config.read_chunk_size);
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            if let Err(e) = connection.run(cancel).await {
                warn!(peer = %peer, error = %e, "Connection failed");
            }
        });
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
