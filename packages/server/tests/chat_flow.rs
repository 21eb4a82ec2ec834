//! End-to-end tests against a server bound to an ephemeral local port.

use std::{collections::VecDeque, net::SocketAddr, sync::Arc, time::Duration};

use lamchat_server::{
    HeartbeatConfig, Server, ServerConfig,
    session::{ChatRoom, USERNAME_PROMPT, WELCOME_BANNER},
};
use lamchat_shared::{FramedTransport, LamportClock, Received, protocol::QUIT_ACK};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::oneshot,
    time::{Instant, timeout},
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const HEARTBEAT_PERIOD: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    room: Arc<ChatRoom>,
    _shutdown: oneshot::Sender<()>,
}

async fn start_server(heartbeat: HeartbeatConfig, clock: Arc<LamportClock>) -> TestServer {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        heartbeat,
    };
    let server = Server::bind_with_clock(config, clock).await.unwrap();
    let addr = server.local_addr().unwrap();
    let room = server.room();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));
    TestServer {
        addr,
        room,
        _shutdown: tx,
    }
}

/// Heartbeat settings loose enough that silent test peers are never evicted
fn relaxed_heartbeat() -> HeartbeatConfig {
    HeartbeatConfig {
        factor: 50,
        ..HeartbeatConfig::default()
    }
}

struct TestPeer {
    transport: FramedTransport<TcpStream>,
    pending: VecDeque<Received>,
}

impl TestPeer {
    async fn connect(addr: SocketAddr, seed: i64) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            transport: FramedTransport::new(stream, Arc::new(LamportClock::new(seed))),
            pending: VecDeque::new(),
        }
    }

    /// Connect and complete the username handshake
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut peer = Self::connect(addr, 1).await;
        assert_eq!(peer.recv_text().await.as_deref(), Some(USERNAME_PROMPT));
        peer.send(name).await;
        assert_eq!(peer.recv_text().await.as_deref(), Some(WELCOME_BANNER));
        peer
    }

    async fn send(&mut self, text: &str) -> i64 {
        self.transport.send(text).await.unwrap()
    }

    /// Next non-heartbeat frame, or `None` once the server closed the socket
    async fn recv(&mut self) -> Option<Received> {
        loop {
            while let Some(received) = self.pending.pop_front() {
                if !received.frame.is_heartbeat() {
                    return Some(received);
                }
            }
            let read = timeout(RECV_TIMEOUT, self.transport.read_frames())
                .await
                .expect("timed out waiting for the server");
            match read {
                Ok(Some(batch)) => self.pending.extend(batch),
                Ok(None) | Err(_) => return None,
            }
        }
    }

    async fn recv_text(&mut self) -> Option<String> {
        self.recv()
            .await
            .map(|received| received.frame.text().into_owned())
    }

    /// Like `recv_text`, but keeps sending heartbeats while waiting
    async fn recv_text_keepalive(&mut self, within: Duration) -> Option<String> {
        let deadline = Instant::now() + within;
        let mut last_heartbeat = Instant::now();
        loop {
            while let Some(received) = self.pending.pop_front() {
                if !received.frame.is_heartbeat() {
                    return Some(received.frame.text().into_owned());
                }
            }
            assert!(Instant::now() < deadline, "no message within {:?}", within);

            if last_heartbeat.elapsed() >= HEARTBEAT_PERIOD {
                self.send("").await;
                last_heartbeat = Instant::now();
            }
            match timeout(HEARTBEAT_PERIOD, self.transport.read_frames()).await {
                Err(_) => {}
                Ok(Ok(Some(batch))) => self.pending.extend(batch),
                Ok(Ok(None)) | Ok(Err(_)) => return None,
            }
        }
    }

    /// Send heartbeats for `duration` without expecting any traffic
    async fn keepalive_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.send("").await;
            tokio::time::sleep(HEARTBEAT_PERIOD).await;
        }
    }
}

#[tokio::test]
async fn test_join_announces_newcomer_to_others_only() {
    // テスト項目: 参加すると歓迎メッセージが届き、他の参加者にだけ参加通知が届く
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;

    // when (操作):
    let _bob = TestPeer::join(server.addr, "bob").await;

    // then (期待する結果):
    assert_eq!(
        ann.recv_text().await.as_deref(),
        Some("bob has joined the chat!")
    );
    assert_eq!(
        server.room.usernames().await,
        vec!["ann".to_string(), "bob".to_string()]
    );
}

#[tokio::test]
async fn test_chat_message_reaches_every_authenticated_peer() {
    // テスト項目: チャットメッセージは送信者を含む全認証済みユーザーに "<name>: <text>" で届く
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;
    let mut bob = TestPeer::join(server.addr, "bob").await;
    assert_eq!(
        ann.recv_text().await.as_deref(),
        Some("bob has joined the chat!")
    );
    let mut lurker = TestPeer::connect(server.addr, 1).await;
    assert_eq!(lurker.recv_text().await.as_deref(), Some(USERNAME_PROMPT));

    // when (操作):
    ann.send("hi").await;

    // then (期待する結果):
    assert_eq!(bob.recv_text().await.as_deref(), Some("ann: hi"));
    assert_eq!(ann.recv_text().await.as_deref(), Some("ann: hi"));
    assert!(
        timeout(Duration::from_millis(200), lurker.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    // テスト項目: 既に使われているユーザー名は拒否され、再入力を促される
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(1))).await;
    let _ann = TestPeer::join(server.addr, "ann").await;
    let mut other = TestPeer::connect(server.addr, 1).await;
    other.recv_text().await;

    // when (操作):
    other.send("ann").await;
    let rejection = other.recv_text().await.unwrap();
    other.send("a").await;
    let too_short = other.recv_text().await.unwrap();
    other.send("cat").await;
    let welcome = other.recv_text().await;

    // then (期待する結果):
    assert!(rejection.starts_with("Sorry, username exists!"));
    assert!(too_short.starts_with("Sorry, username must be at least two characters long!"));
    assert_eq!(welcome.as_deref(), Some(WELCOME_BANNER));
}

#[tokio::test]
async fn test_quit_acknowledges_closes_and_announces_departure() {
    // テスト項目: :quit で確認応答が返り、接続が閉じられ、他の参加者に退出が通知される
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;
    let mut bob = TestPeer::join(server.addr, "bob").await;
    ann.recv_text().await;

    // when (操作):
    ann.send(":quit").await;

    // then (期待する結果):
    assert_eq!(ann.recv_text().await.as_deref(), Some(QUIT_ACK));
    assert_eq!(ann.recv_text().await, None);
    assert_eq!(
        bob.recv_text().await.as_deref(),
        Some("ann has left the chat!")
    );
    assert_eq!(server.room.usernames().await, vec!["bob".to_string()]);
}

#[tokio::test]
async fn test_silent_client_is_evicted_after_timeout() {
    // テスト項目: ハートビートを送らないクライアントは約 800ms 後に退出させられる
    // given (前提条件):
    let server = start_server(HeartbeatConfig::default(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;
    let silent_since = Instant::now();
    let mut bob = TestPeer::join(server.addr, "bob").await;

    // when (操作):
    let notice = bob.recv_text_keepalive(Duration::from_secs(3)).await;
    let elapsed = silent_since.elapsed();

    // then (期待する結果):
    assert_eq!(notice.as_deref(), Some("ann has left the chat!"));
    assert!(elapsed >= Duration::from_millis(700), "evicted after {:?}", elapsed);
    assert_eq!(
        ann.recv_text().await.as_deref(),
        Some("bob has joined the chat!")
    );
    assert_eq!(ann.recv_text().await, None);
    assert_eq!(server.room.usernames().await, vec!["bob".to_string()]);
}

#[tokio::test]
async fn test_heartbeats_keep_connection_alive() {
    // テスト項目: ハートビートを送り続ける限り、タイムアウトを超えても接続は維持される
    // given (前提条件):
    let server = start_server(HeartbeatConfig::default(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;

    // when (操作):
    ann.keepalive_for(Duration::from_millis(1_500)).await;
    ann.send("still here").await;

    // then (期待する結果):
    assert_eq!(ann.recv_text().await.as_deref(), Some("ann: still here"));
    assert_eq!(server.room.connection_count().await, 1);
}

#[tokio::test]
async fn test_chat_lines_alone_keep_connection_alive() {
    // テスト項目: ハートビートを送らなくても、チャットメッセージを送り続ければ接続は維持される
    // given (前提条件):
    let server = start_server(HeartbeatConfig::default(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;

    // when (操作):
    for i in 0..6 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        ann.send(&format!("line {}", i)).await;
    }

    // then (期待する結果):
    for i in 0..6 {
        let expected = format!("ann: line {}", i);
        assert_eq!(ann.recv_text().await.as_deref(), Some(expected.as_str()));
    }
    assert_eq!(server.room.usernames().await, vec!["ann".to_string()]);
}

#[tokio::test]
async fn test_protocol_violation_closes_only_offending_connection() {
    // テスト項目: 不正なフレームを送った接続だけが閉じられ、他の参加者に退出が通知される
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(1))).await;
    let mut ann = TestPeer::join(server.addr, "ann").await;
    let mut bob = TestPeer::join(server.addr, "bob").await;
    assert_eq!(
        ann.recv_text().await.as_deref(),
        Some("bob has joined the chat!")
    );
    let mut bad = Vec::new();
    bad.extend_from_slice(&7i64.to_be_bytes());
    bad.extend_from_slice(&(-1i32).to_be_bytes());

    // when (操作):
    ann.transport.get_mut().write_all(&bad).await.unwrap();

    // then (期待する結果):
    assert_eq!(
        bob.recv_text().await.as_deref(),
        Some("ann has left the chat!")
    );
    assert_eq!(ann.recv_text().await, None);
    bob.send("still here").await;
    assert_eq!(bob.recv_text().await.as_deref(), Some("bob: still here"));
    assert_eq!(server.room.usernames().await, vec!["bob".to_string()]);
}

#[tokio::test]
async fn test_server_replies_are_causally_after_client_frames() {
    // テスト項目: クライアントの時刻がサーバーより進んでいても、返信のタイムスタンプはそれより大きい
    // given (前提条件):
    let server = start_server(relaxed_heartbeat(), Arc::new(LamportClock::new(10))).await;
    let mut peer = TestPeer::connect(server.addr, 500_000).await;
    peer.recv().await;

    // when (操作):
    let sent_at = peer.send("ann").await;
    let welcome = peer.recv().await.unwrap();

    // then (期待する結果):
    assert!(sent_at > 500_000);
    assert!(welcome.frame.timestamp > sent_at);
    assert!(welcome.received_at > welcome.frame.timestamp);
}
