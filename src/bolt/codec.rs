//! Chunked message framing for `tokio_util`.
//!
//! A Bolt message is written as one or more chunks, each prefixed by its
//! length as a big-endian `u16`, and terminated by an empty chunk (`00 00`).
//! Empty chunks between messages are keep-alives and carry no message.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::message::{BoltRequest, BoltResponse};
use super::packstream::{decode, PackStreamEncoder, PackStreamValue};
use super::BoltError;

/// Largest chunk the encoder emits.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024;

/// Largest reassembled message the decoder accepts by default.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const END_OF_MESSAGE: [u8; 2] = [0x00, 0x00];

/// Frames single PackStream values as chunked messages.
#[derive(Debug)]
pub struct BoltCodec {
    max_message_size: usize,
    /// Chunks of the message currently being reassembled
    pending: BytesMut,
    /// Serialized outgoing message before it is split into chunks
    scratch: BytesMut,
}

impl BoltCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            pending: BytesMut::with_capacity(4096),
            scratch: BytesMut::with_capacity(1024),
        }
    }

    fn write_chunks(payload: &[u8], dst: &mut BytesMut) {
        dst.reserve(payload.len() + 2 * (payload.len() / MAX_CHUNK_SIZE + 2));
        for chunk in payload.chunks(MAX_CHUNK_SIZE) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_OF_MESSAGE);
    }
}

impl Default for BoltCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BoltCodec {
    type Item = PackStreamValue;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }
            let chunk_len = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_len == 0 {
                src.advance(2);
                if self.pending.is_empty() {
                    continue;
                }
                let message = self.pending.split();
                return decode(&message).map(Some).map_err(BoltError::PackStream);
            }

            if src.len() < 2 + chunk_len {
                src.reserve(2 + chunk_len - src.len());
                return Ok(None);
            }

            let size = self.pending.len() + chunk_len;
            if size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.pending.extend_from_slice(&src.split_to(chunk_len));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(value) => Ok(Some(value)),
            None if buf.is_empty() && self.pending.is_empty() => Ok(None),
            None => Err(BoltError::Protocol("stream ended inside a message".into())),
        }
    }
}

impl Encoder<PackStreamValue> for BoltCodec {
    type Error = BoltError;

    fn encode(&mut self, item: PackStreamValue, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.scratch.clear();
        PackStreamEncoder::new(&mut self.scratch).write(&item)?;
        Self::write_chunks(&self.scratch, dst);
        Ok(())
    }
}

/// Client side of a connection: writes requests, reads responses.
#[derive(Debug, Default)]
pub struct BoltClientCodec {
    inner: BoltCodec,
}

impl BoltClientCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for BoltClientCodec {
    type Item = BoltResponse;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(PackStreamValue::Structure(s)) => Ok(Some(BoltResponse::from_structure(s)?)),
            Some(other) => Err(BoltError::Protocol(format!(
                "expected a message structure, got {}",
                other.type_name()
            ))),
            None => Ok(None),
        }
    }
}

impl Encoder<BoltRequest> for BoltClientCodec {
    type Error = BoltError;

    fn encode(&mut self, item: BoltRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(PackStreamValue::Structure(item.into_structure()), dst)
    }
}
