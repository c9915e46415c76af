use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

/// Transfer event log. Separate from `tracing` diagnostics: one line per
/// completed operation, meant to be kept.
pub trait Logger: Send + Sync {
    fn start(&self, _bind: &str, _root: &Path) {}
    fn login(&self, _peer: SocketAddr, _user: &str, _ok: bool) {}
    fn upload(&self, _peer: SocketAddr, _file: &str, _bytes: u64) {}
    fn download(&self, _peer: SocketAddr, _file: &str, _bytes: u64) {}
    fn delete(&self, _peer: SocketAddr, _user: &str, _file: &str) {}
    fn error(&self, _context: &str, _peer: SocketAddr, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        let mut f = self.file.lock();
        let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
    }
}

impl Logger for TextLogger {
    fn start(&self, bind: &str, root: &Path) {
        self.line(&format!("START bind={} root={}", bind, root.display()));
    }
    fn login(&self, peer: SocketAddr, user: &str, ok: bool) {
        let result = if ok { "ok" } else { "denied" };
        self.line(&format!("LOGIN peer={peer} user={user} result={result}"));
    }
    fn upload(&self, peer: SocketAddr, file: &str, bytes: u64) {
        self.line(&format!("UPLOAD peer={peer} file={file} bytes={bytes}"));
    }
    fn download(&self, peer: SocketAddr, file: &str, bytes: u64) {
        self.line(&format!("DOWNLOAD peer={peer} file={file} bytes={bytes}"));
    }
    fn delete(&self, peer: SocketAddr, user: &str, file: &str) {
        self.line(&format!("DELETE peer={peer} user={user} file={file}"));
    }
    fn error(&self, context: &str, peer: SocketAddr, msg: &str) {
        self.line(&format!("ERROR ctx={context} peer={peer} msg={msg}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_logger_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/events.log");
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let logger = TextLogger::new(&path).unwrap();
        logger.login(peer, "user1", true);
        logger.upload(peer, "report.txt", 42);
        logger.delete(peer, "user1", "report.txt");
        drop(logger);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("LOGIN peer=127.0.0.1:5000 user=user1 result=ok"));
        assert!(lines[1].ends_with("UPLOAD peer=127.0.0.1:5000 file=report.txt bytes=42"));
        assert!(lines[2].ends_with("DELETE peer=127.0.0.1:5000 user=user1 file=report.txt"));
    }
}
