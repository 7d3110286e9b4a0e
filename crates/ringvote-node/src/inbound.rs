//! The inbound server: one connection per message, processed one at a
//! time.

use crate::{handlers, outbound, timer, NodeContext};
use ringvote_protocol::read_message;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

/// How often the accept loop wakes up to re-check the consensus
/// deadline when no connection has arrived.
const DEADLINE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors raised by the inbound listener or a single connection.
#[derive(Debug, Error)]
pub enum InboundError {
    /// A structural error (bind failure, unknown peer).
    #[error(transparent)]
    Types(#[from] ringvote_types::Error),
    /// A framing/decoding error reading the inbound message.
    #[error(transparent)]
    Protocol(#[from] ringvote_protocol::ProtocolError),
}

/// Binds `ctx`'s port and accepts connections until the node begins
/// terminating. Each connection carries exactly one message; connections
/// are handled concurrently, but message processing itself is
/// serialized by [`NodeContext::lock_processing`].
///
/// # Errors
///
/// Returns [`InboundError::Types`] wrapping [`ringvote_types::Error::BindFailure`]
/// if the listening socket cannot be bound.
pub async fn run_inbound_server(ctx: Arc<NodeContext>) -> Result<(), InboundError> {
    let addr = format!("0.0.0.0:{}", ctx.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ringvote_types::Error::BindFailure {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(%addr, id = %ctx.id, "inbound listener bound");

    while !ctx.is_terminating() {
        if timer::is_deadline_expired(&ctx) {
            tracing::info!(id = %ctx.id, "consensus deadline expired, shutting down fleet");
            timer::shutdown_fleet(&ctx).await;
            break;
        }

        let (socket, peer_addr) = match tokio::time::timeout(DEADLINE_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) => {
                tracing::warn!(%err, "accept failed");
                continue;
            }
            Err(_elapsed) => continue,
        };

        let task_ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, &task_ctx).await {
                tracing::warn!(%peer_addr, %err, "connection handling failed");
            }
        });
    }

    tracing::info!(id = %ctx.id, "inbound listener shutting down");
    Ok(())
}

async fn handle_connection(mut socket: TcpStream, ctx: &NodeContext) -> Result<(), InboundError> {
    let wait_start = Instant::now();
    let message = read_message(&mut socket).await?;
    ctx.metrics.record_wait(wait_start.elapsed());

    if timer::is_deadline_expired(ctx) {
        tracing::info!(id = %ctx.id, "consensus deadline expired, dropping message before dispatch");
        timer::shutdown_fleet(ctx).await;
        return Ok(());
    }

    let _guard = ctx.lock_processing().await;
    let result = handlers::handle_message(message, ctx).await;

    if let Some(outbound_message) = &result.outbound {
        if let Err(err) = outbound::forward_to_successor(ctx, outbound_message).await {
            tracing::warn!(%err, "failed to forward message");
        }
    }

    if result.announce_shutdown {
        tracing::info!(id = %ctx.id, "poll accepted, fanning shutdown out to the fleet");
        timer::shutdown_fleet(ctx).await;
    } else if result.shutdown_self {
        ctx.begin_terminating();
    }

    Ok(())
}
