//! Discovery responder tests: probes get exactly one hostname reply, and
//! garbage datagrams are dropped without killing the loop.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use lanfs_core::discovery::{local_hostname, DiscoveryResponder};
use lanfs_core::protocol::{
    decode_datagram, decode_payload, encode_datagram, MessageType, TextPayload,
};

async fn start_responder() -> SocketAddr {
    let responder = DiscoveryResponder::bind(0).await.expect("bind responder");
    let addr = responder.local_addr().expect("local addr");
    let addr = SocketAddr::from(([127, 0, 0, 1], addr.port()));

    tokio::spawn(async move {
        let _ = responder.run().await;
    });

    addr
}

async fn probe(socket: &UdpSocket, target: SocketAddr) -> (MessageType, String) {
    let datagram = encode_datagram(MessageType::Discovery, &[]).expect("encode probe");
    socket.send_to(&datagram, target).await.expect("send probe");

    let mut buf = [0u8; 4096];
    let (len, _) = tokio::time::timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
        .await
        .expect("reply before timeout")
        .expect("recv");

    let (header, payload) = decode_datagram(&buf[..len]).expect("decode reply");
    let text: TextPayload = decode_payload(&payload).expect("decode payload");
    (header.message_type, text.text)
}

#[tokio::test]
async fn test_probe_elicits_hostname_reply() {
    let target = start_responder().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");

    let (kind, hostname) = probe(&socket, target).await;
    assert_eq!(kind, MessageType::Success);
    assert_eq!(hostname, local_hostname());
}

#[tokio::test]
async fn test_malformed_datagram_gets_no_reply() {
    let target = start_responder().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");

    socket.send_to(b"complete garbage", target).await.expect("send");

    let mut buf = [0u8; 4096];
    let result =
        tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await;
    assert!(result.is_err(), "garbage must not be answered");
}

#[tokio::test]
async fn test_responder_survives_malformed_datagrams() {
    let target = start_responder().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");

    socket.send_to(b"not a frame", target).await.expect("send");
    socket.send_to(&[], target).await.expect("send");

    // Valid probes keep working after the garbage.
    let (kind, _) = probe(&socket, target).await;
    assert_eq!(kind, MessageType::Success);
}

#[tokio::test]
async fn test_non_discovery_message_is_ignored() {
    let target = start_responder().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");

    // A well-formed frame of the wrong type is ignored, not answered.
    let datagram = encode_datagram(MessageType::Delete, b"{\"path\":\"x\"}").expect("encode");
    socket.send_to(&datagram, target).await.expect("send");

    let mut buf = [0u8; 4096];
    let result =
        tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await;
    assert!(result.is_err());

    let (kind, _) = probe(&socket, target).await;
    assert_eq!(kind, MessageType::Success);
}
