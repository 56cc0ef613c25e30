//! Programmatic client operations.
//!
//! A [`Client`] wraps one authenticated TCP connection. Every method is a
//! blocking (awaited) call performing one full request/reply cycle, plus
//! the raw byte stream for transfers. A FAILURE reply surfaces as
//! [`Error::OperationFailed`] carrying the server-supplied text; there are
//! no structured error codes on the wire.
//!
//! Server-side paths are always relative to the server's shared root; any
//! notion of a current directory lives in the front end, not here.

use std::path::{Path, PathBuf};

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::protocol::{
    self, MessageType, PathPayload, RenamePayload, TextPayload, TreeNode, TreePayload,
};
use crate::transfer;

/// An authenticated connection to a lanfs server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] on wrong credentials; the
    /// server closes the socket, so retrying requires a new connection.
    pub async fn login(
        addr: impl ToSocketAddrs,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;

        let payload = protocol::encode_payload(&TextPayload::new(username))?;
        protocol::write_frame(&mut stream, MessageType::Request, &payload).await?;

        // The password prompt; nothing in it matters beyond its arrival.
        let _ = protocol::read_frame(&mut stream).await?;

        let payload = protocol::encode_payload(&TextPayload::new(password))?;
        protocol::write_frame(&mut stream, MessageType::Request, &payload).await?;

        let (header, _) = protocol::read_frame(&mut stream).await?;
        match header.message_type {
            MessageType::Success => Ok(Self { stream }),
            MessageType::Failure => Err(Error::AuthenticationFailed),
            other => Err(Error::CorruptFrame(format!(
                "unexpected login reply type {other:?}"
            ))),
        }
    }

    /// Download a file into a destination directory, creating it if needed.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the server rejects the request.
    pub async fn download(&mut self, remote: &str, dest_dir: &Path) -> Result<PathBuf> {
        let payload = protocol::encode_payload(&PathPayload {
            path: remote.to_string(),
        })?;
        protocol::write_frame(&mut self.stream, MessageType::Download, &payload).await?;
        self.expect_reply().await?;

        let name = Path::new(remote)
            .file_name()
            .ok_or_else(|| Error::InvalidTarget(format!("'{remote}' has no file name")))?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(name);

        let mut file = tokio::fs::File::create(&dest).await?;
        transfer::receive_into(&mut self.stream, &mut file).await?;

        Ok(dest)
    }

    /// Upload a local file to a path under the server's shared root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the server rejects the request,
    /// or [`Error::InvalidTarget`] if `local` is not a regular file.
    pub async fn upload(&mut self, local: &Path, remote: &str) -> Result<()> {
        // Stat before sending the request. Once the server has replied
        // SUCCESS it expects a byte stream; bailing out after that point
        // would leave the connection desynchronized.
        let metadata = tokio::fs::metadata(local).await?;
        if !metadata.is_file() {
            return Err(Error::InvalidTarget(format!(
                "{} is not a file",
                local.display()
            )));
        }

        let payload = protocol::encode_payload(&PathPayload {
            path: remote.to_string(),
        })?;
        protocol::write_frame(&mut self.stream, MessageType::Upload, &payload).await?;
        self.expect_reply().await?;

        transfer::send_file(&mut self.stream, local).await
    }

    /// Create a directory (and parents) under the shared root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the server rejects the request.
    pub async fn mkdir(&mut self, remote: &str) -> Result<()> {
        self.simple_request(MessageType::Mkdir, remote).await?;
        Ok(())
    }

    /// Fetch the formatted metadata block for a path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the target does not exist.
    pub async fn detail(&mut self, remote: &str) -> Result<String> {
        self.simple_request(MessageType::Detail, remote).await
    }

    /// Rename a file or directory within the shared root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the destination exists.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let payload = protocol::encode_payload(&RenamePayload {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        protocol::write_frame(&mut self.stream, MessageType::Rename, &payload).await?;
        self.expect_reply().await?;
        Ok(())
    }

    /// Delete a file under the shared root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if removal fails.
    pub async fn delete(&mut self, remote: &str) -> Result<()> {
        self.simple_request(MessageType::Delete, remote).await?;
        Ok(())
    }

    /// Recursively delete a directory under the shared root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the target is a plain file.
    pub async fn rmdir(&mut self, remote: &str) -> Result<()> {
        self.simple_request(MessageType::Rmdir, remote).await?;
        Ok(())
    }

    /// Fetch the server's directory structure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the server cannot read its
    /// root.
    pub async fn tree(&mut self) -> Result<TreeNode> {
        protocol::write_frame(&mut self.stream, MessageType::Tree, &[]).await?;
        self.expect_reply().await?;

        let (header, payload) = protocol::read_frame(&mut self.stream).await?;
        if header.message_type != MessageType::Tree {
            return Err(Error::CorruptFrame(format!(
                "expected tree structure, got {:?}",
                header.message_type
            )));
        }

        let tree: TreePayload = protocol::decode_payload(&payload)?;
        Ok(tree.root)
    }

    /// Send a path-carrying request and await its single reply.
    async fn simple_request(&mut self, kind: MessageType, remote: &str) -> Result<String> {
        let payload = protocol::encode_payload(&PathPayload {
            path: remote.to_string(),
        })?;
        protocol::write_frame(&mut self.stream, kind, &payload).await?;
        self.expect_reply().await
    }

    /// Read the SUCCESS-or-FAILURE reply, returning its body text.
    async fn expect_reply(&mut self) -> Result<String> {
        let (header, payload) = protocol::read_frame(&mut self.stream).await?;
        let body: TextPayload = protocol::decode_payload(&payload)?;

        match header.message_type {
            MessageType::Success => Ok(body.text),
            MessageType::Failure => Err(Error::OperationFailed(body.text)),
            other => Err(Error::CorruptFrame(format!(
                "unexpected reply type {other:?}"
            ))),
        }
    }
}
