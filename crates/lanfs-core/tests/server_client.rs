//! End-to-end tests: a real server on ephemeral ports, driven through the
//! programmatic client.

use std::net::SocketAddr;
use std::path::PathBuf;

use lanfs_core::client::Client;
use lanfs_core::config::Config;
use lanfs_core::server::Server;
use lanfs_core::Error;

const CREDENTIALS: &str = "alice secret\nbob hunter2\n";

/// Boot a server on ephemeral ports over a fresh temporary root.
///
/// Returns the tempdir (keeping the root alive), the shared root path, and
/// the TCP address to connect to.
async fn start_server() -> (tempfile::TempDir, PathBuf, SocketAddr) {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("shared");
    let credentials_file = dir.path().join("authorized_users");
    std::fs::write(&credentials_file, CREDENTIALS).expect("write credentials");

    let config = Config {
        root: root.clone(),
        tcp_port: 0,
        udp_port: 0,
        credentials_file,
    };

    let server = Server::bind(&config).await.expect("bind server");
    let addr = server.local_addr().expect("local addr");
    let addr = SocketAddr::from(([127, 0, 0, 1], addr.port()));

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (dir, root, addr)
}

async fn login(addr: SocketAddr) -> Client {
    Client::login(addr, "alice", "secret").await.expect("login")
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let (_dir, _root, addr) = start_server().await;

    assert!(Client::login(addr, "alice", "secret").await.is_ok());
    assert!(Client::login(addr, "bob", "hunter2").await.is_ok());
}

#[tokio::test]
async fn test_login_rejected_with_wrong_password() {
    let (_dir, _root, addr) = start_server().await;

    let err = Client::login(addr, "alice", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed));

    // The rejection affects only that socket; a fresh connection with the
    // right password still works.
    assert!(Client::login(addr, "alice", "secret").await.is_ok());
}

#[tokio::test]
async fn test_upload_download_roundtrip() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let downloads = dir.path().join("downloads");

    for (i, size) in [0usize, 1, 1024, 1024 * 1024 + 1].into_iter().enumerate() {
        let content: Vec<u8> = (0..size).map(|b| (b % 251) as u8).collect();
        let local = dir.path().join(format!("local{i}.bin"));
        tokio::fs::write(&local, &content).await.expect("write local");

        let remote = format!("upload{i}.bin");
        client.upload(&local, &remote).await.expect("upload");

        let fetched = client.download(&remote, &downloads).await.expect("download");
        let bytes = tokio::fs::read(&fetched).await.expect("read download");
        assert_eq!(bytes, content, "mismatch for {size} bytes");
    }
}

#[tokio::test]
async fn test_share_scenario_end_to_end() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let local = dir.path().join("a.txt");
    tokio::fs::write(&local, b"hello").await.expect("write");

    client.upload(&local, "a.txt").await.expect("upload");

    let detail = client.detail("a.txt").await.expect("detail");
    assert!(detail.contains("size (bytes) : 5"));

    client.rename("a.txt", "b.txt").await.expect("rename");

    let fetched = client
        .download("b.txt", &dir.path().join("downloads"))
        .await
        .expect("download");
    assert_eq!(tokio::fs::read(&fetched).await.expect("read"), b"hello");

    client.delete("b.txt").await.expect("delete");

    let err = client.detail("b.txt").await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));
}

#[tokio::test]
async fn test_rename_rejects_existing_destination() {
    let (dir, root, addr) = start_server().await;
    let mut client = login(addr).await;

    let local = dir.path().join("x.txt");
    tokio::fs::write(&local, b"one").await.expect("write");
    client.upload(&local, "one.txt").await.expect("upload");
    client.upload(&local, "two.txt").await.expect("upload");

    let err = client.rename("one.txt", "two.txt").await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));

    // Both files are untouched.
    assert!(root.join("one.txt").is_file());
    assert!(root.join("two.txt").is_file());
}

#[tokio::test]
async fn test_rmdir_on_plain_file_fails_and_preserves_it() {
    let (dir, root, addr) = start_server().await;
    let mut client = login(addr).await;

    let local = dir.path().join("f.txt");
    tokio::fs::write(&local, b"content").await.expect("write");
    client.upload(&local, "f.txt").await.expect("upload");

    let err = client.rmdir("f.txt").await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));
    assert_eq!(std::fs::read(root.join("f.txt")).expect("read"), b"content");
}

#[tokio::test]
async fn test_mkdir_is_idempotent_over_the_wire() {
    let (_dir, root, addr) = start_server().await;
    let mut client = login(addr).await;

    client.mkdir("docs/archive").await.expect("mkdir");
    std::fs::write(root.join("docs/archive/keep.txt"), b"x").expect("write");

    client.mkdir("docs/archive").await.expect("mkdir again");
    assert!(root.join("docs/archive/keep.txt").is_file());
}

#[tokio::test]
async fn test_rmdir_removes_directory_recursively() {
    let (dir, root, addr) = start_server().await;
    let mut client = login(addr).await;

    let local = dir.path().join("f.txt");
    tokio::fs::write(&local, b"x").await.expect("write");
    client.upload(&local, "stuff/deep/f.txt").await.expect("upload");
    assert!(root.join("stuff/deep/f.txt").is_file());

    client.rmdir("stuff").await.expect("rmdir");
    assert!(!root.join("stuff").exists());
}

#[tokio::test]
async fn test_tree_reflects_structure() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    client.mkdir("docs").await.expect("mkdir");
    let local = dir.path().join("a.txt");
    tokio::fs::write(&local, b"x").await.expect("write");
    client.upload(&local, "a.txt").await.expect("upload");
    client.upload(&local, "docs/inner.txt").await.expect("upload");

    let tree = client.tree().await.expect("tree");
    assert!(tree.is_dir);

    let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "docs"]);
    assert_eq!(tree.children[1].children[0].name, "inner.txt");
}

#[tokio::test]
async fn test_traversal_attempts_are_rejected() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let err = client
        .download("../authorized_users", &dir.path().join("downloads"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));

    let err = client.detail("/etc/passwd").await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));

    // The connection survives the rejection.
    client.mkdir("still-works").await.expect("mkdir");
}

#[tokio::test]
async fn test_download_missing_file_fails() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let err = client
        .download("ghost.txt", &dir.path().join("downloads"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));
}

#[tokio::test]
async fn test_download_directory_fails() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    client.mkdir("adir").await.expect("mkdir");
    let err = client
        .download("adir", &dir.path().join("downloads"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));
}

#[tokio::test]
async fn test_upload_overwrites_existing_file() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    tokio::fs::write(&first, b"first version").await.expect("write");
    tokio::fs::write(&second, b"second").await.expect("write");

    client.upload(&first, "target.txt").await.expect("upload");
    client.upload(&second, "target.txt").await.expect("overwrite");

    let fetched = client
        .download("target.txt", &dir.path().join("downloads"))
        .await
        .expect("download");
    assert_eq!(tokio::fs::read(&fetched).await.expect("read"), b"second");
}

#[tokio::test]
async fn test_upload_missing_local_file_leaves_session_usable() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let err = client
        .upload(&dir.path().join("no-such-file.txt"), "up.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    // The failure happened before any frame was sent, so the same
    // connection keeps working.
    client.mkdir("still-works").await.expect("mkdir");
}

#[tokio::test]
async fn test_upload_directory_is_rejected_locally() {
    let (dir, _root, addr) = start_server().await;
    let mut client = login(addr).await;

    let err = client.upload(dir.path(), "up.txt").await.unwrap_err();
    assert!(matches!(err, Error::InvalidTarget(_)));

    client.mkdir("still-works").await.expect("mkdir");
}

#[tokio::test]
async fn test_concurrent_clients_are_independent() {
    let (dir, _root, addr) = start_server().await;

    let local = dir.path().join("shared.txt");
    tokio::fs::write(&local, b"payload").await.expect("write");

    let mut first = login(addr).await;
    let mut second = login(addr).await;

    first.upload(&local, "from-first.txt").await.expect("upload");
    second.upload(&local, "from-second.txt").await.expect("upload");

    assert!(first.detail("from-second.txt").await.is_ok());
    assert!(second.detail("from-first.txt").await.is_ok());
}
