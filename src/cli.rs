//! Shared CLI helpers and small reusable Clap fragments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// depotd options
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Filedepot server")]
pub struct DaemonOpts {
    /// Bind address (host:port)
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Directory holding stored files (created if missing)
    #[arg(long, default_value = "server_files")]
    pub root: PathBuf,

    /// TOML credential table ([users] name = "password"); built-in table if omitted
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Append transfer events to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

/// depot options: one command per invocation
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Filedepot client")]
pub struct ClientOpts {
    /// Server address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub server: String,

    /// Local directory for uploads and downloads
    #[arg(long, default_value = "client_files")]
    pub dir: PathBuf,

    /// Log in as this user before running the command
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// Password for --user
    #[arg(long, requires = "user")]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Clone, Debug, Subcommand)]
pub enum ClientCommand {
    /// List files stored on the server
    List,
    /// Upload <dir>/<name> to the server
    Upload { name: String },
    /// Download <name> into <dir>
    Download { name: String },
    /// Delete <name> on the server (needs --user/--password)
    Delete { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_defaults() {
        let opts = DaemonOpts::parse_from(["depotd"]);
        assert_eq!(opts.bind, "0.0.0.0:8080");
        assert_eq!(opts.root, PathBuf::from("server_files"));
        assert!(opts.credentials.is_none());
        assert!(opts.log_file.is_none());
    }

    #[test]
    fn client_subcommands() {
        let opts = ClientOpts::parse_from([
            "depot", "--user", "user1", "--password", "pass1", "delete", "report.txt",
        ]);
        assert_eq!(opts.user.as_deref(), Some("user1"));
        assert!(matches!(opts.command, ClientCommand::Delete { ref name } if name == "report.txt"));

        let opts = ClientOpts::parse_from(["depot", "--dir", "/tmp/x", "upload", "a.bin"]);
        assert_eq!(opts.dir, PathBuf::from("/tmp/x"));
        assert!(matches!(opts.command, ClientCommand::Upload { .. }));
    }

    #[test]
    fn user_requires_password() {
        assert!(ClientOpts::try_parse_from(["depot", "--user", "u", "list"]).is_err());
    }
}
