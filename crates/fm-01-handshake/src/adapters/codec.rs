//! Codec for the handshake protocol.
//!
//! One JSON object per stream inside an unsigned-varint length-delimited
//! frame, the same framing other libp2p protocols use.

use asynchronous_codec::{FramedRead, FramedWrite};
use bytes::Bytes;
use futures::{AsyncRead, AsyncWrite, SinkExt, StreamExt};
use unsigned_varint::codec::UviBytes;

use crate::domain::config::MIN_NONCE_LEN;
use crate::domain::errors::CodecError;
use crate::domain::message::HandshakeMessage;

fn codec(max_len: usize) -> UviBytes {
    let mut codec = UviBytes::default();
    codec.set_max_len(max_len);
    codec
}

/// Serialize to JSON, enforcing the frame limit.
pub fn encode_message(msg: &HandshakeMessage, max_len: usize) -> Result<Bytes, CodecError> {
    let json = serde_json::to_vec(msg).map_err(|e| CodecError::Json(e.to_string()))?;
    if json.len() > max_len {
        return Err(CodecError::TooLarge {
            size: json.len(),
            max: max_len,
        });
    }
    Ok(Bytes::from(json))
}

/// Parse a frame body and check the nonce.
pub fn decode_message(body: &[u8]) -> Result<HandshakeMessage, CodecError> {
    let msg: HandshakeMessage =
        serde_json::from_slice(body).map_err(|e| CodecError::Json(e.to_string()))?;

    if msg.nonce.len() < MIN_NONCE_LEN * 2 {
        return Err(CodecError::InvalidNonce(format!(
            "{} hex chars, need at least {}",
            msg.nonce.len(),
            MIN_NONCE_LEN * 2
        )));
    }
    if !msg.nonce.bytes().all(|b| b.is_ascii_hexdigit()) || msg.nonce.len() % 2 != 0 {
        return Err(CodecError::InvalidNonce("not hex".to_string()));
    }
    Ok(msg)
}

/// Read exactly one handshake frame.
pub async fn read_message<S>(io: &mut S, max_len: usize) -> Result<HandshakeMessage, CodecError>
where
    S: AsyncRead + Unpin,
{
    let mut reader = FramedRead::new(io, codec(max_len));

    match reader.next().await {
        Some(Ok(frame)) => decode_message(&frame),
        Some(Err(e)) => Err(CodecError::Frame(e.to_string())),
        None => Err(CodecError::UnexpectedEof),
    }
}

/// Write one already encoded body as a frame and flush. Does not close the
/// stream.
pub async fn write_frame<S>(io: &mut S, body: Bytes, max_len: usize) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut writer = FramedWrite::new(io, codec(max_len));
    writer.send(body).await
}

/// Encode and write one handshake frame. Does not close the stream.
pub async fn write_message<S>(
    io: &mut S,
    msg: &HandshakeMessage,
    max_len: usize,
) -> Result<(), CodecError>
where
    S: AsyncWrite + Unpin,
{
    let body = encode_message(msg, max_len)?;
    write_frame(io, body, max_len)
        .await
        .map_err(|e| CodecError::Frame(e.to_string()))
}
