//! Client session driver.
//!
//! The client owns exactly one connection. [`run_session`] multiplexes the
//! outbound queue (console lines and heartbeats) with frames arriving from
//! the server until the server acknowledges `:quit` or the connection fails.

use std::sync::Arc;

use lamchat_shared::{FramedTransport, LamportClock, TransportError, protocol::QUIT_ACK};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use crate::error::ClientError;

/// A chat frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub text: String,
    /// Timestamp the server stamped on the frame
    pub sent_at: i64,
    /// Local clock value after observing the frame
    pub received_at: i64,
}

/// Where the session reports what happened on the wire
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink {
    fn on_message(&mut self, message: &ReceivedMessage);

    /// A chat line left the client with the given timestamp
    fn on_sent(&mut self, timestamp: i64);
}

/// Drive the connection until the session ends.
///
/// Returns `Ok(())` once the server acknowledges `:quit` or every producer
/// has dropped its end of the outbound queue. End-of-stream without an
/// acknowledgement is an error.
pub async fn run_session<S, K>(
    stream: S,
    clock: Arc<LamportClock>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    sink: &mut K,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: MessageSink + ?Sized,
{
    let mut transport = FramedTransport::new(stream, clock);

    let result = loop {
        tokio::select! {
            biased;

            next = outbound.recv() => {
                let Some(payload) = next else {
                    break Ok(());
                };
                match transport.send(&payload).await {
                    Ok(timestamp) if !payload.is_empty() => sink.on_sent(timestamp),
                    Ok(_) => {}
                    Err(e) => break Err(e.into()),
                }
            }

            read = transport.read_frames() => match read {
                Ok(Some(batch)) => {
                    let mut acknowledged = false;
                    for received in batch {
                        let frame = received.frame;
                        if frame.is_heartbeat() {
                            continue;
                        }
                        let text = frame.text();
                        if text == QUIT_ACK {
                            acknowledged = true;
                            break;
                        }
                        sink.on_message(&ReceivedMessage {
                            text: text.into_owned(),
                            sent_at: frame.timestamp,
                            received_at: received.received_at,
                        });
                    }
                    if acknowledged {
                        tracing::debug!("Server acknowledged quit");
                        break Ok(());
                    }
                }
                Ok(None) => {
                    break Err(ClientError::ConnectionError(
                        "Server closed the connection".to_string(),
                    ));
                }
                Err(TransportError::Protocol(e)) => {
                    break Err(ClientError::ConnectionError(format!(
                        "Malformed frame from server: {}",
                        e
                    )));
                }
                Err(e) => break Err(e.into()),
            },
        }
    };

    transport.shutdown().await;
    result
}
