//! Filedepot library
//!
//! Remote file repository served over one persistent TCP connection per
//! client, with per-file reader/writer locking on the server

pub mod auth;
pub mod cli;
pub mod client;
pub mod codec;
pub mod command;
pub mod error;
pub mod locks;
pub mod logger;
pub mod names;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transfer;

pub use client::Client;
pub use error::{DepotError, Result};
pub use server::{serve, serve_listener, ServerState};
