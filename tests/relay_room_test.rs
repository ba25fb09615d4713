//! Integration tests for the chat room: join notices, broadcast fan-out,
//! disconnect handling, and shutdown, all over real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use rustrelay::protocol::codec;
use rustrelay::{Config, ChatServer, Result, ShutdownSignal};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// A scripted room participant speaking the framed discipline
struct FakeClient {
    stream: TcpStream,
    addr: SocketAddr,
}

impl FakeClient {
    async fn join(server: SocketAddr) -> Self {
        let stream = TcpStream::connect(server).await.expect("connect failed");
        let addr = stream.local_addr().unwrap();
        Self { stream, addr }
    }

    async fn send(&mut self, payload: &[u8]) {
        codec::write_frame(&mut self.stream, payload)
            .await
            .expect("send failed");
    }

    async fn recv(&mut self) -> Bytes {
        timeout(RECV_TIMEOUT, codec::read_frame(&mut self.stream, 4096))
            .await
            .expect("timed out waiting for a message")
            .expect("read failed")
            .expect("server closed the connection")
    }

    async fn recv_text(&mut self) -> String {
        String::from_utf8(self.recv().await.to_vec()).expect("non-utf8 message")
    }

    /// Assert nothing arrives within the silence window
    async fn assert_silent(&mut self) {
        let received = timeout(SILENCE_WINDOW, codec::read_frame(&mut self.stream, 4096)).await;
        assert!(
            received.is_err(),
            "expected silence, got {:?}",
            received.unwrap()
        );
    }
}

async fn start_room() -> (SocketAddr, ShutdownSignal, JoinHandle<Result<()>>) {
    let mut config = Config::default().server;
    config.bind_addr = "127.0.0.1:0".parse().unwrap();

    let mut server = ChatServer::new(config);
    let addr = server.bind().await.expect("bind failed");
    let signal = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.run().await });
    (addr, signal, handle)
}

fn enter_notice(addr: &SocketAddr) -> String {
    format!("\n[{}:{}] entered the room\n", addr.ip(), addr.port())
}

fn offline_notice(addr: &SocketAddr) -> String {
    format!("\nClient ({}, {}) is offline\n", addr.ip(), addr.port())
}

#[tokio::test]
async fn test_enter_notices_reach_only_earlier_peers() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;

    let mut c2 = FakeClient::join(addr).await;
    assert_eq!(c1.recv_text().await, enter_notice(&c2.addr));

    let mut c3 = FakeClient::join(addr).await;
    assert_eq!(c1.recv_text().await, enter_notice(&c3.addr));
    assert_eq!(c2.recv_text().await, enter_notice(&c3.addr));

    // The announced peer itself hears nothing
    c3.assert_silent().await;

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_broadcast_reaches_everyone_but_the_sender() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;
    let mut c2 = FakeClient::join(addr).await;
    c1.recv().await; // c2 enter notice
    let mut c3 = FakeClient::join(addr).await;
    c1.recv().await;
    c2.recv().await;

    c3.send(b"Hello").await;
    let expected = format!("\r<({}, {})> Hello", c3.addr.ip(), c3.addr.port());
    assert_eq!(c1.recv_text().await, expected);
    assert_eq!(c2.recv_text().await, expected);
    c3.assert_silent().await;

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_broadcasts_one_offline_notice() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;
    let mut c2 = FakeClient::join(addr).await;
    c1.recv().await;
    let mut c3 = FakeClient::join(addr).await;
    c1.recv().await;
    c2.recv().await;

    let c1_addr = c1.addr;
    drop(c1);

    assert_eq!(c2.recv_text().await, offline_notice(&c1_addr));
    assert_eq!(c3.recv_text().await, offline_notice(&c1_addr));

    // Exactly one notice per departure
    c2.assert_silent().await;
    c3.assert_silent().await;

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_departed_peer_receives_no_later_traffic() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;
    let mut c2 = FakeClient::join(addr).await;
    c1.recv().await;

    drop(c2);
    let mut c1_probe = c1.recv_text().await; // offline notice for c2
    assert!(c1_probe.contains("is offline"));

    // A message sent after the eviction reaches only live peers; the
    // sender itself must also hear nothing back
    c1.send(b"anyone there?").await;
    c1.assert_silent().await;

    let mut c3 = FakeClient::join(addr).await;
    c1_probe = c1.recv_text().await;
    assert_eq!(c1_probe, enter_notice(&c3.addr));
    c3.send(b"yes").await;
    assert_eq!(
        c1.recv_text().await,
        format!("\r<({}, {})> yes", c3.addr.ip(), c3.addr.port())
    );

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_large_message_relayed_verbatim() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;
    let mut c2 = FakeClient::join(addr).await;
    c1.recv().await;

    // 10000 bytes spans three 4096-byte receive chunks on both hops
    let payload: Vec<u8> = (0..10000usize).map(|i| (i % 251) as u8).collect();
    c2.send(&payload).await;

    let received = c1.recv().await;
    let header = format!("\r<({}, {})> ", c2.addr.ip(), c2.addr.port());
    assert_eq!(received.len(), header.len() + payload.len());
    assert_eq!(&received[..header.len()], header.as_bytes());
    assert_eq!(&received[header.len()..], &payload[..]);

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_messages_between_joins_keep_order() {
    let (addr, signal, handle) = start_room().await;

    let mut c1 = FakeClient::join(addr).await;
    let mut c2 = FakeClient::join(addr).await;
    c1.recv().await;

    c2.send(b"one").await;
    c2.send(b"two").await;

    let prefix = format!("\r<({}, {})> ", c2.addr.ip(), c2.addr.port());
    assert_eq!(c1.recv_text().await, format!("{}one", prefix));
    assert_eq!(c1.recv_text().await, format!("{}two", prefix));

    signal.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stop_twice_leaves_loop_terminated() {
    let (addr, signal, handle) = start_room().await;

    let _c1 = FakeClient::join(addr).await;
    signal.stop();
    signal.stop();

    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("server should stop promptly")
        .unwrap();
    assert!(result.is_ok());

    // The room is gone: new connections find no acceptor
    let probe = TcpStream::connect(addr).await;
    if let Ok(mut stream) = probe {
        // A connect may still land in the kernel backlog; the closed
        // listener means no traffic will ever arrive
        match codec::read_frame(&mut stream, 4096).await {
            Ok(Some(message)) => panic!("unexpected message from a closed room: {:?}", message),
            Ok(None) | Err(_) => {}
        }
    }
}
