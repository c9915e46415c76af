//! Chunked file streaming and the server-side transfer engine.
//!
//! A transfer holds its file lock for the whole body, never between chunks:
//! downloads take the shared lock, uploads the exclusive one.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

use crate::codec::{self, Header};
use crate::error::{DepotError, Result};
use crate::locks::LockRegistry;
use crate::names;
use crate::protocol::CHUNK_SIZE;

/// Running byte count and rate for one transfer. Reporting only.
#[derive(Debug, Clone)]
pub struct Throughput {
    started: Instant,
    bytes: u64,
}

impl Throughput {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
        }
    }

    pub fn record(&mut self, n: u64) {
        self.bytes += n;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// MB/s since start (0 until any time has elapsed).
    pub fn mb_per_sec(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.bytes as f64 / (1024.0 * 1024.0 * elapsed)
        } else {
            0.0
        }
    }

    /// Whole percent of `total` done; an empty transfer is 100%.
    pub fn percent_of(&self, total: u64) -> u64 {
        if total == 0 {
            100
        } else {
            ((self.bytes as u128 * 100) / total as u128) as u64
        }
    }
}

/// Copies exactly `size` bytes from `src` (a file) to `dst` (the connection).
///
/// The source yielding fewer than `size` bytes is a fault: the receiver is
/// already waiting for the declared length.
pub async fn stream_out<R, W>(src: &mut R, dst: &mut W, size: u64, file: &str) -> Result<Throughput>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut meter = Throughput::start();
    let mut buf = vec![0u8; CHUNK_SIZE];
    while meter.bytes() < size {
        let want = (size - meter.bytes()).min(CHUNK_SIZE as u64) as usize;
        let n = src.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(DepotError::PrematureEof {
                expected: size,
                received: meter.bytes(),
            });
        }
        dst.write_all(&buf[..n]).await?;
        meter.record(n as u64);
        trace!(
            file,
            percent = meter.percent_of(size),
            mbps = meter.mb_per_sec(),
            "sending"
        );
    }
    dst.flush().await?;
    Ok(meter)
}

/// Copies exactly `size` bytes from `src` (the connection) into `dst` (a file).
///
/// Reads never ask for more than the remaining body so bytes of the next
/// command stay on the connection. A zero-byte read before `size` is reached
/// ends the transfer with [`DepotError::PrematureEof`]; what arrived so far is
/// flushed to `dst` and left in place.
pub async fn stream_in<R, W>(src: &mut R, dst: &mut W, size: u64, file: &str) -> Result<Throughput>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut meter = Throughput::start();
    let mut buf = vec![0u8; CHUNK_SIZE];
    while meter.bytes() < size {
        let want = (size - meter.bytes()).min(CHUNK_SIZE as u64) as usize;
        let n = src.read(&mut buf[..want]).await?;
        if n == 0 {
            dst.flush().await?;
            return Err(DepotError::PrematureEof {
                expected: size,
                received: meter.bytes(),
            });
        }
        dst.write_all(&buf[..n]).await?;
        meter.record(n as u64);
        trace!(
            file,
            percent = meter.percent_of(size),
            mbps = meter.mb_per_sec(),
            "receiving"
        );
    }
    dst.flush().await?;
    Ok(meter)
}

/// Result of a transfer that did not fault the connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferOutcome {
    /// Body fully transferred.
    Completed { bytes: u64, mbps: f64 },
    /// Sentinel sent (download) or received (upload); no body.
    Missing,
    /// Upload body read and thrown away (bad name or unwritable destination).
    Discarded { bytes: u64 },
}

/// Streams stored files to and from session connections under per-file locks.
#[derive(Debug)]
pub struct TransferEngine {
    root: PathBuf,
    locks: LockRegistry,
}

impl TransferEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: LockRegistry::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Sends `name` to the peer: size header then body, under a shared lock.
    ///
    /// An invalid name or unopenable file is answered with the sentinel header
    /// and reported as [`TransferOutcome::Missing`], not as an error.
    pub async fn send_file<W: AsyncWrite + Unpin>(
        &self,
        conn: &mut W,
        name: &str,
    ) -> Result<TransferOutcome> {
        let path = match names::resolve(&self.root, name) {
            Ok(p) => p,
            Err(e) => {
                warn!(file = name, error = %e, "download refused");
                codec::write_sentinel(conn).await?;
                return Ok(TransferOutcome::Missing);
            }
        };

        let _guard = self.locks.acquire_shared(name).await;

        let opened = match File::open(&path).await {
            Ok(f) => match f.metadata().await {
                Ok(meta) if meta.is_file() => Some((f, meta.len())),
                _ => None,
            },
            Err(_) => None,
        };
        let Some((mut file, size)) = opened else {
            info!(file = name, "client requested non-existent file");
            codec::write_sentinel(conn).await?;
            return Ok(TransferOutcome::Missing);
        };

        codec::write_header(conn, size).await?;
        let meter = stream_out(&mut file, conn, size, name).await?;
        info!(
            file = name,
            bytes = meter.bytes(),
            mbps = meter.mb_per_sec(),
            "sent"
        );
        Ok(TransferOutcome::Completed {
            bytes: meter.bytes(),
            mbps: meter.mb_per_sec(),
        })
    }

    /// Receives `name` from the peer under the exclusive lock.
    ///
    /// The destination is created (or truncated) before the header is read, so
    /// a sentinel from the peer leaves an empty file behind. A short body is a
    /// connection fault and the partial file is kept.
    pub async fn receive_file<R: AsyncRead + Unpin>(
        &self,
        conn: &mut R,
        name: &str,
    ) -> Result<TransferOutcome> {
        let path = match names::resolve(&self.root, name) {
            Ok(p) => p,
            Err(e) => {
                warn!(file = name, error = %e, "upload refused");
                return discard_upload(conn).await;
            }
        };

        let _guard = self.locks.acquire_exclusive(name).await;

        let mut file = match File::create(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(file = name, error = %e, "cannot create destination");
                return discard_upload(conn).await;
            }
        };

        let size = match codec::read_header(conn).await? {
            Header::Missing => {
                info!(file = name, "client failed to send file");
                return Ok(TransferOutcome::Missing);
            }
            Header::Size(size) => size,
        };

        let meter = stream_in(conn, &mut file, size, name).await?;
        info!(
            file = name,
            bytes = meter.bytes(),
            mbps = meter.mb_per_sec(),
            "received"
        );
        Ok(TransferOutcome::Completed {
            bytes: meter.bytes(),
            mbps: meter.mb_per_sec(),
        })
    }
}

/// Reads an upload's header and body without storing anything.
async fn discard_upload<R: AsyncRead + Unpin>(conn: &mut R) -> Result<TransferOutcome> {
    let size = match codec::read_header(conn).await? {
        Header::Missing => return Ok(TransferOutcome::Missing),
        Header::Size(size) => size,
    };
    let copied = tokio::io::copy(&mut (&mut *conn).take(size), &mut tokio::io::sink()).await?;
    if copied < size {
        return Err(DepotError::PrematureEof {
            expected: size,
            received: copied,
        });
    }
    debug!(bytes = copied, "upload body discarded");
    Ok(TransferOutcome::Discarded { bytes: copied })
}
