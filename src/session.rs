//! Per-connection command dispatch.
//!
//! ```text
//! Unauthenticated --LOGIN ok--> Authenticated
//! Authenticated   --LOGIN bad-> Unauthenticated
//! any             --EXIT / EOF / connection fault--> (session ends)
//! ```
//!
//! Only DELETE is gated on login. UPLOAD, DOWNLOAD and LIST are open to
//! unauthenticated sessions.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::codec;
use crate::command::Command;
use crate::error::Result;
use crate::names;
use crate::server::ServerState;
use crate::transfer::TransferOutcome;

/// Authentication state of a session. A user name exists only once a LOGIN
/// has matched the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { user: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { user } => Some(user),
            AuthState::Unauthenticated => None,
        }
    }
}

/// What the dispatch loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session<R, W> {
    reader: BufReader<R>,
    writer: W,
    peer: SocketAddr,
    auth: AuthState,
    server: Arc<ServerState>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, peer: SocketAddr, server: Arc<ServerState>) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            peer,
            auth: AuthState::Unauthenticated,
            server,
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Reads and dispatches commands until EXIT or the peer goes away.
    ///
    /// Protocol-level failures are answered in-band and never end the loop.
    /// An `Err` is recorded in the event log under `connection` when the
    /// transport failed, and under `session` otherwise.
    pub async fn run(mut self) -> Result<()> {
        let result = self.dispatch_loop().await;
        if let Err(e) = &result {
            let context = if e.is_connection_fault() { "connection" } else { "session" };
            self.server.logger().error(context, self.peer, &e.to_string());
        }
        let _ = self.writer.shutdown().await;
        result
    }

    async fn dispatch_loop(&mut self) -> Result<()> {
        while let Some(line) = codec::read_command_line(&mut self.reader).await? {
            debug!(peer = %self.peer, line = %line, "command");
            if self.handle(Command::parse(&line)).await? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Executes one command against the server state.
    pub async fn handle(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Login { user, password } => self.login(user, password).await?,
            Command::List => self.list().await?,
            Command::Upload(name) => self.upload(name.unwrap_or_default()).await?,
            Command::Download(name) => self.download(name.unwrap_or_default()).await?,
            Command::Delete(name) => self.delete(name).await?,
            Command::Exit => return Ok(Flow::Exit),
            Command::Unknown(name) => {
                let msg = codec::error(&format!("Unknown command '{name}'."));
                codec::write_reply(&mut self.writer, &[msg]).await?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn login(&mut self, user: Option<String>, password: Option<String>) -> Result<()> {
        let accepted = match (&user, &password) {
            (Some(u), Some(p)) => self.server.credentials().verify(u, p),
            _ => false,
        };
        let user = user.unwrap_or_default();
        self.server.logger().login(self.peer, &user, accepted);

        let reply = if accepted {
            info!(peer = %self.peer, user = %user, "login accepted");
            let msg = codec::success(&format!("Login successful. Welcome {user}"));
            self.auth = AuthState::Authenticated { user };
            msg
        } else {
            info!(peer = %self.peer, user = %user, "login rejected");
            self.auth = AuthState::Unauthenticated;
            codec::error("Invalid username or password.")
        };
        codec::write_reply(&mut self.writer, &[reply]).await
    }

    async fn list(&mut self) -> Result<()> {
        match list_files(self.server.engine().root()).await {
            Ok(names) => codec::write_reply(&mut self.writer, &names).await,
            Err(e) => {
                warn!(error = %e, "listing storage root failed");
                let msg = codec::error(&format!("Could not list files: {e}"));
                codec::write_reply(&mut self.writer, &[msg]).await
            }
        }
    }

    async fn upload(&mut self, name: String) -> Result<()> {
        let outcome = self.server.engine().receive_file(&mut self.reader, &name).await?;
        if let TransferOutcome::Completed { bytes, .. } = outcome {
            self.server.logger().upload(self.peer, &name, bytes);
        }
        Ok(())
    }

    async fn download(&mut self, name: String) -> Result<()> {
        let outcome = self.server.engine().send_file(&mut self.writer, &name).await?;
        if let TransferOutcome::Completed { bytes, .. } = outcome {
            self.server.logger().download(self.peer, &name, bytes);
        }
        Ok(())
    }

    async fn delete(&mut self, name: Option<String>) -> Result<()> {
        let AuthState::Authenticated { user } = &self.auth else {
            let msg = codec::error("Permission denied. Please log in to delete files.");
            return codec::write_reply(&mut self.writer, &[msg]).await;
        };
        let user = user.clone();

        let Some(name) = name else {
            let msg = codec::error("Usage: DELETE <filename>");
            return codec::write_reply(&mut self.writer, &[msg]).await;
        };
        let engine = self.server.engine();
        let path = match names::resolve(engine.root(), &name) {
            Ok(p) => p,
            Err(e) => {
                let msg = codec::error(&e.to_string());
                return codec::write_reply(&mut self.writer, &[msg]).await;
            }
        };

        let removed = {
            let _guard = engine.locks().acquire_exclusive(&name).await;
            tokio::fs::remove_file(&path).await
        };
        let msg = match removed {
            Ok(()) => {
                info!(peer = %self.peer, user = %user, file = %name, "deleted");
                self.server.logger().delete(self.peer, &user, &name);
                codec::success(&format!("File '{name}' deleted."))
            }
            Err(e) => {
                debug!(file = %name, error = %e, "delete failed");
                codec::error(&format!("File '{name}' not found or could not be deleted."))
            }
        };
        codec::write_reply(&mut self.writer, &[msg]).await
    }
}

/// Names of regular files in the storage root, sorted.
///
/// Files whose names could not be addressed by a command (not UTF-8, or
/// failing [`names::validate_name`]) are left out.
async fn list_files(root: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut listed = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if names::validate_name(&name).is_ok() => listed.push(name),
            Ok(name) => debug!(file = ?name, "not listing unaddressable name"),
            Err(raw) => debug!(file = ?raw, "not listing non-UTF-8 name"),
        }
    }
    listed.sort();
    Ok(listed)
}
