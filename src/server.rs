//! depotd accept loop.
//!
//! Every accepted connection gets its own detached task running a
//! [`Session`]. There is no session limit, no lock-wait timeout and no
//! graceful shutdown: a stalled peer keeps its file lock until its
//! connection is closed from outside.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::auth::CredentialStore;
use crate::logger::{Logger, NoopLogger};
use crate::session::Session;
use crate::transfer::TransferEngine;

/// Process-lifetime context shared by all sessions.
pub struct ServerState {
    engine: TransferEngine,
    credentials: Arc<dyn CredentialStore>,
    logger: Arc<dyn Logger>,
}

impl ServerState {
    pub fn new(root: impl Into<PathBuf>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            engine: TransferEngine::new(root),
            credentials,
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }
}

/// Binds `bind` and serves forever.
pub async fn serve(bind: &str, state: Arc<ServerState>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {}", bind))?;
    state.logger().start(bind, state.engine().root());
    serve_listener(listener, state).await
}

/// Serves an already bound listener forever.
pub async fn serve_listener(listener: TcpListener, state: Arc<ServerState>) -> Result<()> {
    info!(
        addr = %listener.local_addr()?,
        root = %state.engine().root().display(),
        "depotd listening"
    );
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        info!(%peer, "client connected");
        tokio::spawn(handle_connection(stream, peer, Arc::clone(&state)));
    }
}

async fn handle_connection(stream: TcpStream, peer: std::net::SocketAddr, state: Arc<ServerState>) {
    let (reader, writer) = stream.into_split();
    match Session::new(reader, writer, peer, state).run().await {
        Ok(()) => info!(%peer, "client disconnected"),
        Err(e) if e.is_connection_fault() => info!(%peer, error = %e, "client connection lost"),
        Err(e) => warn!(%peer, error = %e, "client session ended with error"),
    }
}
