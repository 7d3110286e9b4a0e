//! Sending a message to the successor, with self-healing on failure.

use crate::{handlers::message_kind, NodeContext};
use ringvote_protocol::{write_message, Message, ProtocolError, Sender};
use ringvote_types::PeerId;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;

/// Upper bound on the jitter applied before every outbound connect
/// attempt, load-bearing for consensus-timeout scenarios: without it, a
/// tight ring on one host can race faster than the deadline check ever
/// observes an in-flight poll.
const MAX_CONNECT_JITTER: Duration = Duration::from_millis(15);

/// Errors raised while sending a message to another peer.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// Framing/encoding failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Connection or write failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A membership or repair error.
    #[error(transparent)]
    Types(#[from] ringvote_types::Error),
}

impl From<crate::NodeError> for OutboundError {
    fn from(err: crate::NodeError) -> Self {
        match err {
            crate::NodeError::Types(e) => OutboundError::Types(e),
            crate::NodeError::Protocol(e) => OutboundError::Protocol(e),
        }
    }
}

/// Connects to `host:port` and writes `message` as the sole payload of
/// the connection.
///
/// # Errors
///
/// Returns [`OutboundError::Io`] if the connection or write fails, or
/// [`OutboundError::Protocol`] if `message` fails to encode.
pub async fn send_to_peer(host: &str, port: u16, message: &Message) -> Result<(), OutboundError> {
    let jitter = Duration::from_micros(rand::random::<u64>() % MAX_CONNECT_JITTER.as_micros() as u64);
    tokio::time::sleep(jitter).await;

    let addr = format!("{host}:{port}");
    let mut stream = TcpStream::connect(&addr).await?;
    write_message(&mut stream, message).await?;
    Ok(())
}

/// Sends `message` to the local successor. If the connection fails, runs
/// ring repair, retries against the repaired successor, then announces
/// the repair with an `update` message.
///
/// # Errors
///
/// Returns an error if repair itself fails (e.g. [`ringvote_types::Error::AloneInRing`])
/// or if the retried send still fails.
pub async fn forward_to_successor(ctx: &NodeContext, message: &Message) -> Result<(), OutboundError> {
    let kind = message_kind(message);
    let successor = ctx.membership.successor_of(ctx.id)?;
    let (host, port) = ctx.membership.lookup(successor)?;

    let start = Instant::now();
    if send_to_peer(&host, port, message).await.is_ok() {
        ctx.metrics.record_propagation(kind, start.elapsed());
        return Ok(());
    }

    tracing::warn!(dead = %successor, "send to successor failed, repairing ring");
    let (new_successor, faulty) = crate::repair_successor(ctx).await?;
    let (host, port) = ctx.membership.lookup(new_successor)?;
    let retry_start = Instant::now();
    send_to_peer(&host, port, message).await?;
    ctx.metrics.record_propagation(kind, retry_start.elapsed());
    announce_repair(ctx, new_successor, faulty).await
}

async fn announce_repair(
    ctx: &NodeContext,
    new_successor: PeerId,
    faulty: Vec<PeerId>,
) -> Result<(), OutboundError> {
    let update = Message::Update {
        sender: Sender::new(ctx.id, ctx.host.clone(), ctx.port),
        initiator_id: ctx.id,
        successor: new_successor,
        faulty_robots: faulty,
    };
    let (host, port) = ctx.membership.lookup(new_successor)?;
    send_to_peer(&host, port, &update).await
}
