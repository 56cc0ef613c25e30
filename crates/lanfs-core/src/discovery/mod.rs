//! UDP discovery: zero-configuration server lookup by hostname.
//!
//! A client broadcasts a DISCOVERY datagram to the well-known discovery
//! port; every listening server replies unicast with SUCCESS carrying its
//! hostname. There is no authentication on discovery; any host on the
//! broadcast domain can probe.
//!
//! The responder runs as a single independent loop, fully separate from the
//! TCP side. Corrupt or truncated datagrams are logged at debug level and
//! dropped; one bad datagram never stops later probes from being answered.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use crate::error::Result;
use crate::protocol::{
    self, MessageType, TextPayload, MAX_DATAGRAM_SIZE,
};

pub use crate::DEFAULT_DISCOVERY_PORT;

/// A server found on the local network.
#[derive(Debug, Clone)]
pub struct DiscoveredHost {
    /// The server's hostname, as reported by the server itself
    pub hostname: String,
    /// Source address of the reply
    pub addr: SocketAddr,
}

/// UDP listener that answers discovery probes with this host's identity.
#[derive(Debug)]
pub struct DiscoveryResponder {
    socket: UdpSocket,
    hostname: String,
}

impl DiscoveryResponder {
    /// Bind the responder to the discovery port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound; callers
    /// treat this as fatal at startup.
    pub async fn bind(port: u16) -> Result<Self> {
        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )?;

        socket.set_reuse_address(true)?;

        #[cfg(target_os = "macos")]
        socket.set_reuse_port(true)?;

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;

        let hostname = local_hostname();

        Ok(Self { socket, hostname })
    }

    /// The address the responder is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receive loop until the socket fails.
    ///
    /// # Errors
    ///
    /// Returns an error only on a socket-level failure; malformed datagrams
    /// and unanswerable senders are logged and skipped.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            "discovery responder listening on {} as '{}'",
            self.socket.local_addr()?,
            self.hostname
        );

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, source) = self.socket.recv_from(&mut buf).await?;

            match protocol::decode_datagram(&buf[..len]) {
                Ok((header, _)) if header.message_type == MessageType::Discovery => {
                    tracing::debug!("discovery probe from {source}");
                    if let Err(e) = self.answer(source).await {
                        tracing::warn!("failed to answer discovery probe from {source}: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("dropping corrupt datagram from {source}: {e}");
                }
            }
        }
    }

    async fn answer(&self, source: SocketAddr) -> Result<()> {
        let payload = protocol::encode_payload(&TextPayload::new(self.hostname.clone()))?;
        let reply = protocol::encode_datagram(MessageType::Success, &payload)?;
        self.socket.send_to(&reply, source).await?;
        Ok(())
    }
}

/// Broadcast a discovery probe and collect replies until the timeout.
///
/// Returns the hosts that answered, deduplicated by source address.
///
/// # Errors
///
/// Returns an error if the broadcast socket cannot be created or the probe
/// cannot be sent.
pub async fn discover(port: u16, timeout: Duration) -> Result<Vec<DiscoveredHost>> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    socket.set_broadcast(true)?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    let socket = UdpSocket::from_std(std_socket)?;

    let probe = protocol::encode_datagram(MessageType::Discovery, &[])?;
    let broadcast_addr = SocketAddrV4::new(Ipv4Addr::BROADCAST, port);
    socket.send_to(&probe, broadcast_addr).await?;

    let deadline = Instant::now() + timeout;
    let mut hosts: Vec<DiscoveredHost> = Vec::new();
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let result = tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await;
        match result {
            Ok(Ok((len, source))) => match protocol::decode_datagram(&buf[..len]) {
                Ok((header, payload)) if header.message_type == MessageType::Success => {
                    let Ok(text) = protocol::decode_payload::<TextPayload>(&payload) else {
                        continue;
                    };
                    if hosts.iter().all(|h| h.addr != source) {
                        hosts.push(DiscoveredHost {
                            hostname: text.text,
                            addr: source,
                        });
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("dropping corrupt discovery reply from {source}: {e}");
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("error receiving discovery reply: {e}");
            }
            Err(_) => break,
        }
    }

    Ok(hosts)
}

/// This host's name, falling back to a placeholder when unavailable.
#[must_use]
pub fn local_hostname() -> String {
    hostname::get().map_or_else(
        |_| "unknown-host".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}
