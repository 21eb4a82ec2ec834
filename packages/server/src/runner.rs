//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use lamchat_shared::{
    LamportClock,
    time::{Clock, SystemClock},
};
use tokio::net::TcpListener;

use crate::{
    config::ServerConfig,
    connection::ConnectionDriver,
    error::ServerError,
    heartbeat::HeartbeatMonitor,
    session::ChatRoom,
    signal::shutdown_signal,
};

/// A bound chat server, ready to accept connections
pub struct Server {
    listener: TcpListener,
    room: Arc<ChatRoom>,
    clock: Arc<LamportClock>,
    time: Arc<dyn Clock>,
    config: ServerConfig,
}

impl Server {
    /// Bind the listening socket and seed the Lamport clock
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with_clock(config, Arc::new(LamportClock::with_random_seed())).await
    }

    /// Bind with an explicit Lamport clock
    pub async fn bind_with_clock(
        config: ServerConfig,
        clock: Arc<LamportClock>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!("Server started on port: {}", listener.local_addr()?.port());
        tracing::info!("Initial counter value: {}", clock.current());

        Ok(Self {
            listener,
            room: Arc::new(ChatRoom::new()),
            clock,
            time: Arc::new(SystemClock),
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn room(&self) -> Arc<ChatRoom> {
        self.room.clone()
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let monitor =
            HeartbeatMonitor::new(self.room.clone(), self.time.clone(), self.config.heartbeat)
                .spawn();

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            // per-connection failures (e.g. aborted handshakes) are not fatal
                            tracing::warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let driver = ConnectionDriver {
                        room: self.room.clone(),
                        clock: self.clock.clone(),
                        time: self.time.clone(),
                    };
                    tokio::spawn(async move { driver.run(stream, addr).await });
                }
            }
        };

        monitor.abort();
        tracing::info!("Server shutdown complete");
        result
    }
}
