//! Wire protocol implementation.
//!
//! Every exchange on the file protocol (TCP) and the discovery protocol
//! (UDP) uses the same framed message layout:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Frame                               │
//! ├────────────┬────────────┬────────────┬─────────────────────┤
//! │   Magic    │  Version   │    Type    │      Length         │
//! │  4 bytes   │  2 bytes   │   1 byte   │      4 bytes        │
//! ├────────────┴────────────┴────────────┴─────────────────────┤
//! │                        Payload                             │
//! │                    (variable length)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Magic: `0x4C 0x4E 0x46 0x53` ("LNFS")
//! - Version: `0x01 0x00` (1.0)
//! - Type: Message type byte
//! - Length: Payload length in bytes (big-endian)
//!
//! Payloads are JSON-encoded and structured per message type: a rename
//! carries an explicit `{ from, to }` pair rather than a delimited string,
//! and a directory listing is a plain recursive [`TreeNode`].
//!
//! On TCP a frame is written with a single buffered write and flushed, so a
//! correct peer never observes a partial frame. On UDP one frame occupies
//! one datagram; anything that fails to decode is a [`Error::CorruptDatagram`]
//! which listeners drop without dying.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// Protocol magic bytes: "LNFS"
pub const MAGIC: [u8; 4] = [0x4C, 0x4E, 0x46, 0x53];

/// Frame header size in bytes
pub const HEADER_SIZE: usize = 11;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Maximum size of a discovery datagram
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Message types of the file and discovery protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Server prompt during the handshake
    Request = 0x01,
    /// Positive reply; body is free text
    Success = 0x02,
    /// Negative reply; body is the failure text
    Failure = 0x03,
    /// UDP discovery probe
    Discovery = 0x04,
    /// Fetch a file from the shared root
    Download = 0x10,
    /// Store a file into the shared root
    Upload = 0x11,
    /// Create a directory (and parents)
    Mkdir = 0x12,
    /// Fetch a metadata block for a path
    Detail = 0x13,
    /// Rename a file or directory
    Rename = 0x14,
    /// Delete a file
    Delete = 0x15,
    /// Recursively delete a directory
    Rmdir = 0x16,
    /// Fetch the shared root's directory structure
    Tree = 0x17,
}

impl MessageType {
    /// Parse a message type from a byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Request),
            0x02 => Some(Self::Success),
            0x03 => Some(Self::Failure),
            0x04 => Some(Self::Discovery),
            0x10 => Some(Self::Download),
            0x11 => Some(Self::Upload),
            0x12 => Some(Self::Mkdir),
            0x13 => Some(Self::Detail),
            0x14 => Some(Self::Rename),
            0x15 => Some(Self::Delete),
            0x16 => Some(Self::Rmdir),
            0x17 => Some(Self::Tree),
            _ => None,
        }
    }
}

/// A protocol frame header.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    /// Protocol version (major, minor)
    pub version: (u8, u8),
    /// Message type
    pub message_type: MessageType,
    /// Payload length
    pub payload_length: u32,
}

impl FrameHeader {
    /// Encode the header to bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = self.version.0;
        buf[5] = self.version.1;
        buf[6] = self.message_type as u8;
        buf[7..11].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode a header from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptFrame`] if the header is invalid.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if buf[0..4] != MAGIC {
            return Err(Error::CorruptFrame("invalid magic bytes".to_string()));
        }

        let version = (buf[4], buf[5]);

        let message_type = MessageType::from_byte(buf[6])
            .ok_or_else(|| Error::CorruptFrame(format!("unknown message type: {:#x}", buf[6])))?;

        let payload_length = u32::from_be_bytes([buf[7], buf[8], buf[9], buf[10]]);

        if payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(Error::CorruptFrame(format!(
                "payload too large: {payload_length} bytes"
            )));
        }

        Ok(Self {
            version,
            message_type,
            payload_length,
        })
    }
}

/// Free-text payload: REQUEST/SUCCESS/FAILURE bodies and the two
/// handshake frames (username, then password).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPayload {
    /// The text body
    pub text: String,
}

impl TextPayload {
    /// Wrap a string slice into a payload.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Root-relative path payload: DOWNLOAD, UPLOAD, MKDIR, DETAIL, DELETE
/// and RMDIR requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPayload {
    /// Path relative to the shared root
    pub path: String,
}

/// Rename request payload with explicit source and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePayload {
    /// Existing path, relative to the shared root
    pub from: String,
    /// New path, relative to the shared root
    pub to: String,
}

/// One node of the shared root's directory structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Entry name (not a path)
    pub name: String,
    /// Whether this entry is a directory
    pub is_dir: bool,
    /// Child entries, sorted by name; empty for files
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

/// TREE response payload carrying the whole structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreePayload {
    /// The shared root
    pub root: TreeNode,
}

/// Encode a message payload to JSON bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a message payload from JSON bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails.
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| Error::Serialization(e.to_string()))
}

/// Read a complete frame from a stream.
///
/// Blocks until a full frame is available or the stream closes.
///
/// # Errors
///
/// Returns [`Error::ConnectionClosed`] if the peer disconnects, or
/// [`Error::CorruptFrame`] if the frame is invalid.
pub async fn read_frame<R>(reader: &mut R) -> Result<(FrameHeader, Vec<u8>)>
where
    R: AsyncReadExt + Unpin,
{
    let mut header_buf = [0u8; HEADER_SIZE];
    read_exact_or_closed(reader, &mut header_buf).await?;

    let header = FrameHeader::decode(&header_buf)?;

    let mut payload = vec![0u8; header.payload_length as usize];
    if header.payload_length > 0 {
        read_exact_or_closed(reader, &mut payload).await?;
    }

    Ok((header, payload))
}

/// Write a complete frame to a stream.
///
/// The header and payload go out in one buffered write and are flushed, so
/// the frame is atomic from the sender's perspective.
///
/// # Errors
///
/// Returns an error if the payload exceeds [`MAX_PAYLOAD_SIZE`] or writing
/// fails.
pub async fn write_frame<W>(writer: &mut W, message_type: MessageType, payload: &[u8]) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::CorruptFrame(format!(
            "payload too large: {} bytes",
            payload.len()
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let header = FrameHeader {
        version: crate::PROTOCOL_VERSION,
        message_type,
        payload_length: payload.len() as u32,
    };

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;

    Ok(())
}

/// Encode a message into a single datagram buffer.
///
/// # Errors
///
/// Returns an error if the message would not fit in one datagram.
pub fn encode_datagram(message_type: MessageType, payload: &[u8]) -> Result<Vec<u8>> {
    if HEADER_SIZE + payload.len() > MAX_DATAGRAM_SIZE {
        return Err(Error::Serialization(format!(
            "message too large for a datagram: {} bytes",
            payload.len()
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let header = FrameHeader {
        version: crate::PROTOCOL_VERSION,
        message_type,
        payload_length: payload.len() as u32,
    };

    let mut datagram = Vec::with_capacity(HEADER_SIZE + payload.len());
    datagram.extend_from_slice(&header.encode());
    datagram.extend_from_slice(payload);
    Ok(datagram)
}

/// Decode a message from a received datagram.
///
/// # Errors
///
/// Returns [`Error::CorruptDatagram`] for anything malformed or truncated;
/// callers drop such datagrams without terminating their receive loop.
pub fn decode_datagram(data: &[u8]) -> Result<(FrameHeader, Vec<u8>)> {
    if data.len() < HEADER_SIZE {
        return Err(Error::CorruptDatagram(format!(
            "datagram too short: {} bytes",
            data.len()
        )));
    }

    let mut header_buf = [0u8; HEADER_SIZE];
    header_buf.copy_from_slice(&data[..HEADER_SIZE]);

    let header = FrameHeader::decode(&header_buf)
        .map_err(|e| Error::CorruptDatagram(e.to_string()))?;

    let payload = &data[HEADER_SIZE..];
    if payload.len() != header.payload_length as usize {
        return Err(Error::CorruptDatagram(format!(
            "payload length mismatch: header says {}, datagram has {}",
            header.payload_length,
            payload.len()
        )));
    }

    Ok((header, payload.to_vec()))
}

async fn read_exact_or_closed<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncReadExt + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
        Err(e) => Err(e.into()),
    }
}
