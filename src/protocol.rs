//! Shared protocol constants for the depot text/binary session protocol

// Transfer body chunk size; matches a typical socket buffer
pub const CHUNK_SIZE: usize = 4096;

// Bound on a single command line. Longer lines are truncated.
pub const MAX_COMMAND_LEN: usize = 1024;

// Width of the transfer size header in bytes (little-endian u64)
pub const HEADER_LEN: usize = 8;

// Size header value meaning "no such file, no payload follows".
// Collides with a real file of exactly u64::MAX bytes; such files cannot be sent.
pub const SENTINEL: u64 = u64::MAX;

// Command names (first token of a command line)
pub mod command {
    pub const LOGIN: &str = "LOGIN";
    pub const LIST: &str = "LIST";
    pub const UPLOAD: &str = "UPLOAD";
    pub const DOWNLOAD: &str = "DOWNLOAD";
    pub const DELETE: &str = "DELETE";
    pub const EXIT: &str = "EXIT";
}

// Reply conventions for non-transfer commands
pub mod reply {
    pub const SUCCESS: &str = "SUCCESS:";
    pub const ERROR: &str = "ERROR:";

    // Upper bound on a reply the client will buffer
    pub const MAX_REPLY_LEN: usize = 16 * 1024 * 1024;
}
