//! # Bolt wire layer
//!
//! Everything needed to talk Bolt over a byte stream, with no knowledge of
//! pools, routing or sessions:
//!
//! - [`packstream`] - binary value format used by every message
//! - [`message`] - request and response messages
//! - [`codec`] - chunked framing as `tokio_util` codecs
//! - [`handshake`] - preamble and version negotiation
//! - [`error`] - wire-level errors
//!
//! Most users want [`crate::driver`] instead.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{BoltClientCodec, BoltCodec};
pub use error::{BoltError, BoltResult};
pub use handshake::BoltVersion;
pub use message::{BoltRequest, BoltResponse, Failure, Success};
pub use packstream::{PackStreamError, PackStreamStructure, PackStreamValue};
