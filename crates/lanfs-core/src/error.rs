//! Error types for lanfs.
//!
//! A single unified error type covers the wire protocol, authentication,
//! filesystem operations, and connection lifecycle. Per-command failures
//! are converted into FAILURE replies at the command boundary and never
//! tear down the server; see [`crate::server`].

use std::io;

use thiserror::Error;

/// A specialized `Result` type for lanfs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for lanfs.
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong username or password; the server closes the connection
    #[error("authentication failed: wrong username or password")]
    AuthenticationFailed,

    /// Target path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong entity kind, e.g. a directory where a file was expected
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Rename destination collision
    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    /// Request path resolves outside the shared root
    #[error("path escapes the shared root: {0}")]
    PathOutsideRoot(String),

    /// Malformed frame on the TCP stream
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    /// Malformed or truncated UDP datagram
    #[error("corrupt datagram: {0}")]
    CorruptDatagram(String),

    /// Peer disconnected or the socket failed mid-exchange
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The server replied with a FAILURE message
    #[error("server reported failure: {0}")]
    OperationFailed(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Payload serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}
