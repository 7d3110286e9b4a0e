//! EOF-delimited JSON framing.
//!
//! One message per connection: the writer serializes to JSON, writes it
//! in a single `write_all`, then shuts down its write half; the reader
//! reads until end-of-stream and deserializes the accumulated bytes.
//! There is no length prefix — a soft cap catches runaway payloads
//! before they reach `serde_json`.

use crate::{Message, ProtocolError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Soft cap on a single encoded message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Serializes `message` and writes it to `stream` in one shot, then
/// closes the write half so the peer's read loop observes EOF.
///
/// # Errors
///
/// Returns [`ProtocolError::TooLarge`] if the encoded message exceeds
/// [`MAX_MESSAGE_SIZE`], or [`ProtocolError::Io`] if the write fails.
pub async fn write_message<W>(stream: &mut W, message: &Message) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let encoded = serde_json::to_vec(message)?;
    if encoded.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge {
            size: encoded.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    stream.write_all(&encoded).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Reads `stream` until end-of-stream and deserializes the accumulated
/// bytes as a single [`Message`].
///
/// # Errors
///
/// Returns [`ProtocolError::TooLarge`] if more than [`MAX_MESSAGE_SIZE`]
/// bytes arrive before EOF, [`ProtocolError::Io`] on a read failure, or
/// [`ProtocolError::Deserialization`] if the bytes are not a valid
/// message.
pub async fn read_message<R>(stream: &mut R) -> Result<Message>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::TooLarge {
                size: buf.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
    }
    Ok(serde_json::from_slice(&buf)?)
}
