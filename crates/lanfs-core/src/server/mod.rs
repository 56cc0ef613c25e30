//! Listening server, connection handlers, and request dispatch.
//!
//! The server owns three independent pieces: an accept loop that spawns one
//! task per TCP connection, the per-connection handler running the
//! authenticate-then-serve state machine, and the UDP discovery responder.
//! Connection workers share only read-only state (the credential store and
//! the shared root), so no locking is involved; two clients writing the
//! same path race at the filesystem level, last writer wins.
//!
//! A connection worker's lifecycle:
//!
//! 1. Read a frame; its payload text is the username (the type is not
//!    checked).
//! 2. Send `REQUEST("Password: ")`, read the password frame.
//! 3. Verify. On failure send FAILURE and close; no retry on this socket.
//! 4. On success send SUCCESS and loop over request frames, dispatching by
//!    message type, until the peer disconnects.
//!
//! Filesystem and per-command I/O errors become FAILURE replies with the
//! error text; they never escape the command boundary. A dead peer kills
//! only its own worker.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::discovery::DiscoveryResponder;
use crate::error::{Error, Result};
use crate::fsops::SharedRoot;
use crate::protocol::{
    self, MessageType, PathPayload, RenamePayload, TextPayload, TreePayload,
};
use crate::transfer;

/// The lanfs server: listening sockets, shared root, and credentials.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    responder: DiscoveryResponder,
    root: SharedRoot,
    credentials: Arc<CredentialStore>,
}

impl Server {
    /// Bind the server's sockets and validate its startup inputs.
    ///
    /// The shared root is created if absent; a root that exists but is not
    /// a directory, an unreadable credentials file, or an unbindable port
    /// are all fatal.
    ///
    /// # Errors
    ///
    /// Returns the first startup failure encountered.
    pub async fn bind(config: &Config) -> Result<Self> {
        let root = SharedRoot::open(&config.root)?;
        let credentials = Arc::new(CredentialStore::load(&config.credentials_file)?);

        let listener = TcpListener::bind(("0.0.0.0", config.tcp_port)).await?;
        let responder = DiscoveryResponder::bind(config.udp_port).await?;

        tracing::info!(
            "serving {} on {} (discovery on {})",
            root.path().display(),
            listener.local_addr()?,
            responder.local_addr()?,
        );

        Ok(Self {
            listener,
            responder,
            root,
            credentials,
        })
    }

    /// The TCP address the file protocol is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The UDP address the discovery responder is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn discovery_addr(&self) -> Result<std::net::SocketAddr> {
        self.responder.local_addr()
    }

    /// Run the discovery responder and the accept loop.
    ///
    /// Never returns under normal operation; each accepted connection is
    /// served on its own task.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop's socket fails.
    pub async fn run(self) -> Result<()> {
        let responder = self.responder;
        tokio::spawn(async move {
            if let Err(e) = responder.run().await {
                tracing::error!("discovery responder stopped: {e}");
            }
        });

        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!("accepted connection from {peer}");

            let root = self.root.clone();
            let credentials = Arc::clone(&self.credentials);
            tokio::spawn(async move {
                match handle_connection(stream, &root, &credentials).await {
                    Ok(()) => tracing::debug!("connection from {peer} closed"),
                    Err(e) => tracing::debug!("connection from {peer} ended: {e}"),
                }
            });
        }
    }
}

/// Serve one client connection: handshake, then the request loop.
async fn handle_connection(
    mut stream: TcpStream,
    root: &SharedRoot,
    credentials: &CredentialStore,
) -> Result<()> {
    // Handshake. The first frame's payload is the username regardless of
    // its message type.
    let (_, payload) = protocol::read_frame(&mut stream).await?;
    let username: TextPayload = protocol::decode_payload(&payload)?;

    send_reply(&mut stream, MessageType::Request, "Password: ").await?;

    let (_, payload) = protocol::read_frame(&mut stream).await?;
    let password: TextPayload = protocol::decode_payload(&payload)?;

    if !credentials.verify(&username.text, &password.text) {
        tracing::info!("rejected login for user '{}'", username.text);
        send_reply(&mut stream, MessageType::Failure, "Wrong username or password").await?;
        return Ok(());
    }

    tracing::info!("user '{}' logged in", username.text);
    send_reply(&mut stream, MessageType::Success, "Login successful").await?;

    // Serving loop. One request, one SUCCESS-or-FAILURE reply, until the
    // peer goes away.
    loop {
        let (header, payload) = match protocol::read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        match header.message_type {
            MessageType::Download => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                handle_download(&mut stream, root, &request.path).await?;
            }
            MessageType::Upload => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                handle_upload(&mut stream, root, &request.path).await?;
            }
            MessageType::Mkdir => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                reply_outcome(&mut stream, root.mkdir(&request.path).map(|()| String::new()))
                    .await?;
            }
            MessageType::Detail => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                reply_outcome(&mut stream, root.detail(&request.path)).await?;
            }
            MessageType::Rename => {
                let request: RenamePayload = protocol::decode_payload(&payload)?;
                reply_outcome(
                    &mut stream,
                    root.rename(&request.from, &request.to).map(|()| String::new()),
                )
                .await?;
            }
            MessageType::Delete => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                reply_outcome(&mut stream, root.delete(&request.path).map(|()| String::new()))
                    .await?;
            }
            MessageType::Rmdir => {
                let request: PathPayload = protocol::decode_payload(&payload)?;
                reply_outcome(&mut stream, root.rmdir(&request.path).map(|()| String::new()))
                    .await?;
            }
            MessageType::Tree => {
                handle_tree(&mut stream, root).await?;
            }
            other => {
                send_reply(
                    &mut stream,
                    MessageType::Failure,
                    &format!("unexpected request type {other:?}"),
                )
                .await?;
            }
        }
    }
}

/// DOWNLOAD: validate the target, reply, then stream the bytes.
async fn handle_download(stream: &mut TcpStream, root: &SharedRoot, path: &str) -> Result<()> {
    let resolved = match root.resolve(path) {
        Ok(p) => p,
        Err(e) => return send_reply(stream, MessageType::Failure, &e.to_string()).await,
    };

    if !resolved.exists() {
        return send_reply(stream, MessageType::Failure, "file does not exist").await;
    }
    if resolved.is_dir() {
        return send_reply(stream, MessageType::Failure, "cannot send a directory").await;
    }

    send_reply(stream, MessageType::Success, "starting transfer").await?;
    transfer::send_file(stream, &resolved).await
}

/// UPLOAD: open the destination, reply, then consume the byte stream.
///
/// The destination is opened before the reply so a client only streams
/// after the server has somewhere to put the bytes. Any existing file at
/// the path is overwritten.
async fn handle_upload(stream: &mut TcpStream, root: &SharedRoot, path: &str) -> Result<()> {
    let resolved = match root.resolve(path) {
        Ok(p) => p,
        Err(e) => return send_reply(stream, MessageType::Failure, &e.to_string()).await,
    };

    if let Some(parent) = resolved.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return send_reply(stream, MessageType::Failure, &e.to_string()).await;
        }
    }

    let mut file = match tokio::fs::File::create(&resolved).await {
        Ok(f) => f,
        Err(e) => return send_reply(stream, MessageType::Failure, &e.to_string()).await,
    };

    send_reply(stream, MessageType::Success, "starting transfer").await?;
    let received = transfer::receive_into(stream, &mut file).await?;
    tracing::debug!("received {received} bytes into {}", resolved.display());
    Ok(())
}

/// TREE: reply, then send the serialized structure in a TREE frame.
async fn handle_tree(stream: &mut TcpStream, root: &SharedRoot) -> Result<()> {
    let tree = match root.tree() {
        Ok(t) => t,
        Err(e) => return send_reply(stream, MessageType::Failure, &e.to_string()).await,
    };

    send_reply(stream, MessageType::Success, "tree follows").await?;
    let payload = protocol::encode_payload(&TreePayload { root: tree })?;
    protocol::write_frame(stream, MessageType::Tree, &payload).await
}

/// Convert a command outcome into the single SUCCESS-or-FAILURE reply.
async fn reply_outcome(stream: &mut TcpStream, outcome: Result<String>) -> Result<()> {
    match outcome {
        Ok(body) => send_reply(stream, MessageType::Success, &body).await,
        Err(e) => send_reply(stream, MessageType::Failure, &e.to_string()).await,
    }
}

async fn send_reply(stream: &mut TcpStream, kind: MessageType, text: &str) -> Result<()> {
    let payload = protocol::encode_payload(&TextPayload::new(text))?;
    protocol::write_frame(stream, kind, &payload).await
}
