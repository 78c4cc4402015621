//! Version negotiation.
//!
//! The client opens with the magic preamble `60 60 B0 17` and four version
//! proposals of four bytes each, most preferred first; unused slots are zero.
//! The server answers with the four bytes of the version it picked, or all
//! zeros when it supports none of them.

mod version;

pub use version::BoltVersion;

use super::{BoltError, BoltResult};

/// Bolt preamble identifying the protocol.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Preamble plus four proposals.
pub const HANDSHAKE_SIZE: usize = 20;

/// The server's answer.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// The bytes the client sends to open a connection.
pub fn client_handshake() -> [u8; HANDSHAKE_SIZE] {
    let mut buf = [0u8; HANDSHAKE_SIZE];
    buf[..4].copy_from_slice(&BOLT_MAGIC);
    for (slot, version) in BoltVersion::PREFERRED.iter().enumerate() {
        let offset = 4 + slot * 4;
        buf[offset..offset + 4].copy_from_slice(&version.to_bytes());
    }
    buf
}

/// Interpret the server's answer to [`client_handshake`].
pub fn negotiated_version(answer: [u8; HANDSHAKE_RESPONSE_SIZE]) -> BoltResult<BoltVersion> {
    if answer == [0; 4] {
        return Err(BoltError::NoCommonVersion);
    }
    // HTTP servers answer a stray Bolt connection with "HTTP"
    if &answer == b"HTTP" {
        return Err(BoltError::Protocol(
            "server answered with HTTP; is the URI pointing at the HTTP port?".into(),
        ));
    }
    BoltVersion::from_bytes(answer).ok_or_else(|| {
        BoltError::Protocol(format!("server picked a version that was not proposed: {:02X?}", answer))
    })
}
