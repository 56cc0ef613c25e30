//! # Lanfs Core Library
//!
//! `lanfs-core` provides the core functionality for lanfs, a LAN file
//! sharing service: a server exposes a directory tree over a custom TCP
//! protocol, guarded by username/password authentication, and answers UDP
//! broadcast probes so clients can discover servers by hostname.
//!
//! ## Modules
//!
//! - [`auth`] - Credential store and username/password verification
//! - [`client`] - Programmatic client operations (login, transfers, fs ops)
//! - [`config`] - Configuration management
//! - [`discovery`] - UDP discovery responder and broadcast probing
//! - [`fsops`] - Filesystem operations scoped to the shared root
//! - [`protocol`] - Wire protocol framing and payloads
//! - [`server`] - Listening server and per-connection handlers
//! - [`transfer`] - Length-prefixed raw byte streaming
//!
//! ## Example
//!
//! ```rust,ignore
//! use lanfs_core::{client::Client, config::Config, server::Server};
//!
//! // On the serving host
//! let server = Server::bind(&Config::default()).await?;
//! server.run().await?;
//!
//! // On another device
//! let mut client = Client::login("192.168.1.10:9999", "alice", "secret").await?;
//! client.upload("notes.txt".as_ref(), "notes.txt").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fsops;
pub mod protocol;
pub mod server;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version carried in every frame header
pub const PROTOCOL_VERSION: (u8, u8) = (1, 0);

/// Default file protocol port (TCP)
pub const DEFAULT_TCP_PORT: u16 = 9999;

/// Default discovery port (UDP)
pub const DEFAULT_DISCOVERY_PORT: u16 = 9998;
