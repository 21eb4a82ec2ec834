//! Session and broadcast management.
//!
//! [`ChatRoom`] is the active-connection set. Every connection moves through
//!
//! ```text
//! Unauthenticated --(unique name)--> Authenticated --(quit/timeout/error)--> Closed
//! ```
//!
//! where "Closed" simply means the connection is no longer in the set, so it
//! is excluded from every later broadcast. Delivery is asynchronous: a
//! broadcast only appends to each recipient's outbound queue and the
//! connection driver drains it on its own schedule.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use lamchat_shared::{
    Liveness,
    protocol::{QUIT_ACK, QUIT_COMMAND},
};
use tokio::sync::{Mutex, Notify, mpsc};

/// Sent to every new connection and after each rejected name
pub const USERNAME_PROMPT: &str = "Choose a unique username to enter the chat room: ";

/// Sent once a username is accepted
pub const WELCOME_BANNER: &str = "\
**************************************************\n\
* Welcome to the chat room! To exit type ':quit' *\n\
**************************************************";

/// Shortest acceptable username, in characters
pub const MIN_USERNAME_CHARS: usize = 2;

/// Outbound FIFO queue of a single connection
pub type Outbound = mpsc::UnboundedSender<String>;

/// What a connection driver hands to the room when it registers
#[derive(Debug, Clone)]
pub struct PeerHandle {
    /// Queue drained by the driver's write path
    pub outbound: Outbound,
    /// Last liveness signal, refreshed by the driver
    pub liveness: Arc<Liveness>,
    /// Fired when the room forcibly evicts the connection
    pub evicted: Arc<Notify>,
}

impl PeerHandle {
    pub fn new(outbound: Outbound, liveness: Arc<Liveness>) -> Self {
        Self {
            outbound,
            liveness,
            evicted: Arc::new(Notify::new()),
        }
    }
}

/// Authentication state of a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(String),
}

/// Why a connection left the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent the quit command
    Quit,
    /// No frame arrived within the heartbeat timeout
    HeartbeatTimeout,
    /// The peer closed its end of the stream
    PeerClosed,
    /// Reading from or writing to the stream failed
    TransportError,
    /// The peer sent an invalid frame
    ProtocolViolation,
}

impl CloseReason {
    /// Reasons the driver cannot observe by itself and must be told about
    fn interrupts_driver(self) -> bool {
        matches!(self, Self::HeartbeatTimeout)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Quit => "quit",
            Self::HeartbeatTimeout => "heartbeat timeout",
            Self::PeerClosed => "closed by peer",
            Self::TransportError => "transport error",
            Self::ProtocolViolation => "protocol violation",
        };
        f.write_str(reason)
    }
}

/// Why a proposed username was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Taken,
    TooShort,
}

impl RejectReason {
    fn message(self) -> String {
        let reason = match self {
            Self::Taken => "Sorry, username exists!",
            Self::TooShort => "Sorry, username must be at least two characters long!",
        };
        format!("{}\n{}", reason, USERNAME_PROMPT)
    }
}

/// Result of handing a chat payload to the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Unknown or already closed connection, or blank text
    Ignored,
    /// Proposed username refused; the connection stays unauthenticated
    Rejected(RejectReason),
    /// The connection is now authenticated under this name
    Joined(String),
    /// A chat line was queued for `recipients` connections
    Broadcast { from: String, recipients: usize },
    /// The connection left; carries its username if it had one
    Left(Option<String>),
}

#[derive(Debug)]
struct Peer {
    handle: PeerHandle,
    username: Option<String>,
}

#[derive(Debug, Default)]
struct RoomState {
    peers: HashMap<SocketAddr, Peer>,
    usernames: HashSet<String>,
}

impl RoomState {
    fn push_to(&self, addr: &SocketAddr, text: &str) {
        if let Some(peer) = self.peers.get(addr)
            && peer.handle.outbound.send(text.to_string()).is_err()
        {
            tracing::warn!("Outbound queue of {} is closed, dropping message", addr);
        }
    }

    /// Queue `text` for every authenticated connection except `exclude`
    fn broadcast(&self, text: &str, exclude: Option<&SocketAddr>) -> usize {
        let mut recipients = 0;
        for (addr, peer) in &self.peers {
            if peer.username.is_none() || exclude == Some(addr) {
                continue;
            }
            if peer.handle.outbound.send(text.to_string()).is_err() {
                tracing::warn!("Failed to queue broadcast for {}", addr);
            } else {
                recipients += 1;
            }
        }
        recipients
    }

    fn authenticate(&mut self, addr: &SocketAddr, name: &str) -> SessionEvent {
        if self.usernames.contains(name) {
            self.push_to(addr, &RejectReason::Taken.message());
            return SessionEvent::Rejected(RejectReason::Taken);
        }
        if name.chars().count() < MIN_USERNAME_CHARS {
            self.push_to(addr, &RejectReason::TooShort.message());
            return SessionEvent::Rejected(RejectReason::TooShort);
        }

        let Some(peer) = self.peers.get_mut(addr) else {
            return SessionEvent::Ignored;
        };
        peer.username = Some(name.to_string());
        self.usernames.insert(name.to_string());

        self.push_to(addr, WELCOME_BANNER);
        self.broadcast(&format!("{} has joined the chat!", name), Some(addr));
        tracing::info!("{} authenticated as '{}'", addr, name);

        SessionEvent::Joined(name.to_string())
    }

    /// Drop the connection from the set, release its name and announce the
    /// departure. Returns `None` if it was already gone.
    fn remove(&mut self, addr: &SocketAddr, reason: CloseReason) -> Option<Option<String>> {
        let peer = self.peers.remove(addr)?;
        if reason.interrupts_driver() {
            peer.handle.evicted.notify_one();
        }

        if let Some(name) = &peer.username {
            self.usernames.remove(name);
            self.broadcast(&format!("{} has left the chat!", name), None);
        }
        tracing::info!("Closed connection with {} ({})", addr, reason);

        Some(peer.username)
    }
}

/// The active-connection set plus username registry
#[derive(Debug, Default)]
pub struct ChatRoom {
    state: Mutex<RoomState>,
}

impl ChatRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted connection and queue the username prompt
    pub async fn register(&self, addr: SocketAddr, handle: PeerHandle) {
        let mut state = self.state.lock().await;
        state.peers.insert(
            addr,
            Peer {
                handle,
                username: None,
            },
        );
        state.push_to(&addr, USERNAME_PROMPT);
        tracing::debug!("Registered {} ({} live)", addr, state.peers.len());
    }

    /// Apply one chat payload received from `addr`
    ///
    /// # Arguments
    ///
    /// * `addr` - Connection the payload arrived on
    /// * `text` - Decoded payload; surrounding whitespace is ignored
    ///
    /// # Returns
    ///
    /// What the payload did to the session, mainly for logging and tests
    pub async fn handle_text(&self, addr: SocketAddr, text: &str) -> SessionEvent {
        let text = text.trim();
        let mut state = self.state.lock().await;

        let Some(peer) = state.peers.get(&addr) else {
            return SessionEvent::Ignored;
        };
        if text.is_empty() {
            return SessionEvent::Ignored;
        }
        let username = peer.username.clone();

        if text == QUIT_COMMAND {
            // ack first, the driver flushes the queue before closing
            state.push_to(&addr, QUIT_ACK);
            return match state.remove(&addr, CloseReason::Quit) {
                Some(name) => SessionEvent::Left(name),
                None => SessionEvent::Ignored,
            };
        }

        match username {
            None => state.authenticate(&addr, text),
            Some(name) => {
                let recipients = state.broadcast(&format!("{}: {}", name, text), None);
                tracing::debug!("'{}' broadcast to {} connections", name, recipients);
                SessionEvent::Broadcast {
                    from: name,
                    recipients,
                }
            }
        }
    }

    /// Close a connection; a no-op if it is already closed
    pub async fn close(&self, addr: SocketAddr, reason: CloseReason) -> SessionEvent {
        let mut state = self.state.lock().await;
        match state.remove(&addr, reason) {
            Some(name) => SessionEvent::Left(name),
            None => SessionEvent::Ignored,
        }
    }

    /// Evict every connection silent for longer than `timeout`
    ///
    /// Returns the evicted addresses with the usernames they held.
    pub async fn evict_stale(
        &self,
        now_millis: u64,
        timeout: Duration,
    ) -> Vec<(SocketAddr, Option<String>)> {
        let mut state = self.state.lock().await;
        let stale: Vec<SocketAddr> = state
            .peers
            .iter()
            .filter(|(_, peer)| peer.handle.liveness.is_stale(now_millis, timeout))
            .map(|(addr, _)| *addr)
            .collect();

        stale
            .into_iter()
            .filter_map(|addr| {
                state
                    .remove(&addr, CloseReason::HeartbeatTimeout)
                    .map(|name| (addr, name))
            })
            .collect()
    }

    /// Session state of a live connection, `None` once closed
    pub async fn state_of(&self, addr: &SocketAddr) -> Option<SessionState> {
        let state = self.state.lock().await;
        state.peers.get(addr).map(|peer| match &peer.username {
            Some(name) => SessionState::Authenticated(name.clone()),
            None => SessionState::Unauthenticated,
        })
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// Names currently held, sorted
    pub async fn usernames(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state.usernames.iter().cloned().collect();
        names.sort();
        names
    }
}
