//! Frame codec for async streams
//!
//! Each message is MessagePack-serialized and prefixed with a 4-byte
//! big-endian unsigned length. A clean EOF on a frame boundary is a normal
//! disconnect; an EOF mid-frame is [`ProtocolError::Truncated`].

use crate::{Message, ProtocolError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size (16MB)
///
/// The protocol itself imposes no bound; this is a hardening limit against
/// a garbage or hostile length prefix.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Codec for reading and writing length-prefixed messages over async streams
pub struct FrameCodec {
    /// Read buffer for incoming data
    read_buf: BytesMut,
    /// Maximum frame size allowed
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Create a new frame codec with default settings
    pub fn new() -> Self {
        Self {
            read_buf: BytesMut::with_capacity(8192),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Create a new frame codec with a custom max frame size
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            read_buf: BytesMut::with_capacity(8192),
            max_frame_size,
        }
    }

    /// Encode a message to bytes with length prefix
    pub fn encode_message(&self, message: &Message) -> Result<Bytes, ProtocolError> {
        let payload =
            rmp_serde::to_vec_named(message).map_err(|e| ProtocolError::Encode(e.to_string()))?;

        if payload.len() > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame_size,
            });
        }

        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.put_slice(&payload);

        Ok(buf.freeze())
    }

    /// Write a message to an async writer
    pub async fn write_message<W>(
        &self,
        writer: &mut W,
        message: &Message,
    ) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let encoded = self.encode_message(message)?;
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one message from an async reader.
    ///
    /// Returns `Ok(None)` when the peer closed the connection on a frame
    /// boundary. A `Decode` error consumes the offending frame, so the
    /// caller may keep reading.
    pub async fn read_message<R>(&mut self, reader: &mut R) -> Result<Option<Message>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(message) = self.try_decode_message()? {
                return Ok(Some(message));
            }

            let mut temp_buf = [0u8; 8192];
            let n = reader.read(&mut temp_buf).await?;

            if n == 0 {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated);
            }

            self.read_buf.extend_from_slice(&temp_buf[..n]);
        }
    }

    /// Try to decode a message from the internal buffer
    pub fn try_decode_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        if self.read_buf.len() < 4 {
            return Ok(None);
        }

        let frame_len = (&self.read_buf[..4]).get_u32() as usize;

        if frame_len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: frame_len,
                max: self.max_frame_size,
            });
        }

        if self.read_buf.len() < 4 + frame_len {
            return Ok(None);
        }

        self.read_buf.advance(4);
        let payload = self.read_buf.split_to(frame_len);

        let message = rmp_serde::from_slice(&payload)
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Ok(Some(message))
    }

    /// Get the current buffer size
    pub fn buffer_size(&self) -> usize {
        self.read_buf.len()
    }
}
