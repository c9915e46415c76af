//! depot client: one persistent connection, one command at a time.

use std::path::Path;

use tokio::fs::File;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::codec::{self, Header};
use crate::command::Command;
use crate::error::{DepotError, Result};
use crate::names;
use crate::protocol::reply;
use crate::transfer::{stream_in, stream_out};

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        codec::write_command_line(&mut self.writer, &command.to_line()).await
    }

    async fn request(&mut self, command: &Command) -> Result<Vec<String>> {
        self.send(command).await?;
        codec::read_reply(&mut self.reader).await
    }

    /// Logs in; returns the server's welcome text.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<String> {
        let lines = self
            .request(&Command::Login {
                user: Some(user.to_string()),
                password: Some(password.to_string()),
            })
            .await?;
        expect_success(lines)
    }

    /// Names of the files stored on the server.
    pub async fn list(&mut self) -> Result<Vec<String>> {
        let lines = self.request(&Command::List).await?;
        if let Some(first) = lines.first() {
            if let Some(msg) = first.strip_prefix(reply::ERROR) {
                return Err(DepotError::Rejected(msg.trim().to_string()));
            }
        }
        Ok(lines)
    }

    /// Deletes `name` on the server (requires a prior login).
    pub async fn delete(&mut self, name: &str) -> Result<String> {
        names::validate_name(name)?;
        let lines = self.request(&Command::Delete(Some(name.to_string()))).await?;
        expect_success(lines)
    }

    /// Uploads `local_dir/name` as `name`; returns bytes sent.
    ///
    /// A local file that cannot be opened is announced with the sentinel so the
    /// server side stays in step, then reported as [`DepotError::LocalNotFound`].
    pub async fn upload(&mut self, local_dir: &Path, name: &str) -> Result<u64> {
        names::validate_name(name)?;
        let path = local_dir.join(name);
        let opened = match File::open(&path).await {
            Ok(f) => match f.metadata().await {
                Ok(meta) if meta.is_file() => Some((f, meta.len())),
                _ => None,
            },
            Err(_) => None,
        };

        self.send(&Command::Upload(Some(name.to_string()))).await?;
        let Some((mut file, size)) = opened else {
            codec::write_sentinel(&mut self.writer).await?;
            return Err(DepotError::LocalNotFound(path));
        };
        codec::write_header(&mut self.writer, size).await?;
        let meter = stream_out(&mut file, &mut self.writer, size, name).await?;
        info!(
            file = name,
            bytes = meter.bytes(),
            mbps = meter.mb_per_sec(),
            "upload complete"
        );
        Ok(meter.bytes())
    }

    /// Downloads `name` into `local_dir/name`; returns bytes received.
    ///
    /// The local file is only created once the server has announced a real
    /// size. A short body leaves the partial file in place.
    pub async fn download(&mut self, name: &str, local_dir: &Path) -> Result<u64> {
        names::validate_name(name)?;
        self.send(&Command::Download(Some(name.to_string()))).await?;
        let size = match codec::read_header(&mut self.reader).await? {
            Header::Missing => return Err(DepotError::RemoteNotFound(name.to_string())),
            Header::Size(size) => size,
        };
        debug!(file = name, size, "download started");
        let mut file = File::create(local_dir.join(name)).await?;
        let meter = stream_in(&mut self.reader, &mut file, size, name).await?;
        info!(
            file = name,
            bytes = meter.bytes(),
            mbps = meter.mb_per_sec(),
            "download complete"
        );
        Ok(meter.bytes())
    }

    /// Sends EXIT and waits for the server to close the connection.
    pub async fn exit(mut self) -> Result<()> {
        self.send(&Command::Exit).await?;
        let mut rest = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut self.reader, &mut rest).await?;
        Ok(())
    }
}

fn expect_success(lines: Vec<String>) -> Result<String> {
    let text = lines.join("\n");
    match text.strip_prefix(reply::ERROR) {
        Some(msg) => Err(DepotError::Rejected(msg.trim().to_string())),
        None => Ok(text),
    }
}
