//! Wire codec for the depot session protocol.
//!
//! ```text
//! COMMAND (client -> server):   one text line, '\n' terminated, at most 1024 bytes kept
//! REPLY   (server -> client):   zero or more text lines, then one empty line
//!
//! TRANSFER (sender -> receiver):
//!   [8 bytes LE: size]          u64::MAX = sentinel, nothing follows
//!   [size bytes: file content]  streamed in 4096 byte chunks
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{DepotError, Result};
use crate::protocol::{reply, HEADER_LEN, MAX_COMMAND_LEN, SENTINEL};

/// Decoded transfer size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// A payload of this many bytes follows.
    Size(u64),
    /// The sender could not produce the file; no payload follows.
    Missing,
}

impl Header {
    fn from_raw(raw: u64) -> Self {
        if raw == SENTINEL {
            Header::Missing
        } else {
            Header::Size(raw)
        }
    }
}

fn encode_header(raw: u64) -> [u8; HEADER_LEN] {
    raw.to_le_bytes()
}

/// Writes a real size header. Sizes equal to the sentinel are refused.
pub async fn write_header<W: AsyncWrite + Unpin>(writer: &mut W, size: u64) -> Result<()> {
    if size == SENTINEL {
        return Err(DepotError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "file size collides with the sentinel header",
        )));
    }
    writer.write_all(&encode_header(size)).await?;
    Ok(())
}

/// Writes the sentinel header: the transfer failed before any payload.
pub async fn write_sentinel<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer.write_all(&encode_header(SENTINEL)).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a size header. A short read is a connection fault.
pub async fn read_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Header> {
    let mut raw = [0u8; HEADER_LEN];
    match reader.read_exact(&mut raw).await {
        Ok(_) => Ok(Header::from_raw(u64::from_le_bytes(raw))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(DepotError::ConnectionClosed)
        }
        Err(e) => Err(e.into()),
    }
}

/// Reads one command line.
///
/// Returns `None` when the peer closed the connection before sending anything.
/// Bytes beyond [`MAX_COMMAND_LEN`] are consumed and dropped so an overlong
/// line never bleeds into the next command.
pub async fn read_command_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>> {
    let mut line: Vec<u8> = Vec::with_capacity(128);
    let mut saw_any = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if !saw_any {
                return Ok(None);
            }
            break;
        }
        saw_any = true;
        let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        let room = MAX_COMMAND_LEN.saturating_sub(line.len());
        line.extend_from_slice(&chunk[..chunk.len().min(room)]);
        reader.consume(consumed);
        if done {
            break;
        }
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Writes a command line.
pub async fn write_command_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes a reply as a single write: each line, then an empty line.
pub async fn write_reply<W, S>(writer: &mut W, lines: &[S]) -> Result<()>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let mut out = String::new();
    for l in lines {
        out.push_str(l.as_ref());
        out.push('\n');
    }
    out.push('\n');
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a reply up to and excluding its empty terminator line.
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut total = 0usize;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(DepotError::ConnectionClosed);
        }
        total += n;
        if total > reply::MAX_REPLY_LEN {
            return Err(DepotError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "reply exceeds maximum length",
            )));
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            return Ok(lines);
        }
        lines.push(trimmed.to_string());
    }
}

/// Formats a `SUCCESS:` reply line.
pub fn success(msg: &str) -> String {
    format!("{} {}", reply::SUCCESS, msg)
}

/// Formats an `ERROR:` reply line.
pub fn error(msg: &str) -> String {
    format!("{} {}", reply::ERROR, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn header_is_little_endian_u64() {
        let mut buf = Vec::new();
        write_header(&mut buf, 0x0102).await.unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(buf, vec![0x02, 0x01, 0, 0, 0, 0, 0, 0]);

        let mut cursor = &buf[..];
        assert_eq!(read_header(&mut cursor).await.unwrap(), Header::Size(0x0102));
    }

    #[tokio::test]
    async fn sentinel_decodes_as_missing() {
        let mut buf = Vec::new();
        write_sentinel(&mut buf).await.unwrap();
        assert_eq!(buf, vec![0xff; 8]);

        let mut cursor = &buf[..];
        assert_eq!(read_header(&mut cursor).await.unwrap(), Header::Missing);
    }

    #[tokio::test]
    async fn sentinel_sized_file_is_refused() {
        let mut buf = Vec::new();
        assert!(write_header(&mut buf, SENTINEL).await.is_err());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn short_header_is_connection_fault() {
        let mut cursor: &[u8] = &[1, 2, 3];
        let err = read_header(&mut cursor).await.unwrap_err();
        assert!(matches!(err, DepotError::ConnectionClosed));
    }

    #[tokio::test]
    async fn command_lines_are_split_on_newline() {
        let data: &[u8] = b"LOGIN user1 pass1\r\nLIST\n";
        let mut reader = BufReader::new(data);
        assert_eq!(
            read_command_line(&mut reader).await.unwrap().as_deref(),
            Some("LOGIN user1 pass1")
        );
        assert_eq!(read_command_line(&mut reader).await.unwrap().as_deref(), Some("LIST"));
        assert_eq!(read_command_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn overlong_command_is_truncated_not_split() {
        let mut data = vec![b'A'; MAX_COMMAND_LEN + 500];
        data.extend_from_slice(b"\nEXIT\n");
        // Small buffer forces the line across several fill_buf calls
        let mut reader = BufReader::with_capacity(64, &data[..]);

        let first = read_command_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(first.len(), MAX_COMMAND_LEN);
        assert_eq!(read_command_line(&mut reader).await.unwrap().as_deref(), Some("EXIT"));
    }

    #[tokio::test]
    async fn unterminated_line_before_eof_is_returned() {
        let mut reader = BufReader::new(&b"LIST"[..]);
        assert_eq!(read_command_line(&mut reader).await.unwrap().as_deref(), Some("LIST"));
        assert_eq!(read_command_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reply_framing() {
        let mut buf = Vec::new();
        write_reply(&mut buf, &["a.txt", "b.txt"]).await.unwrap();
        write_reply::<_, &str>(&mut buf, &[]).await.unwrap();
        write_reply(&mut buf, &[success("done")]).await.unwrap();
        assert_eq!(&buf[..], b"a.txt\nb.txt\n\n\nSUCCESS: done\n\n");

        let mut reader = BufReader::new(&buf[..]);
        assert_eq!(read_reply(&mut reader).await.unwrap(), vec!["a.txt", "b.txt"]);
        assert!(read_reply(&mut reader).await.unwrap().is_empty());
        assert_eq!(read_reply(&mut reader).await.unwrap(), vec!["SUCCESS: done"]);
        assert!(matches!(
            read_reply(&mut reader).await.unwrap_err(),
            DepotError::ConnectionClosed
        ));
    }
}
