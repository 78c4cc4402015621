//! Bolt protocol messages.
//!
//! Every message is a PackStream structure whose tag names the message.
//! Requests flow client to server; each request is answered by zero or more
//! RECORD messages followed by exactly one summary (SUCCESS, FAILURE or
//! IGNORED).

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

/// Message tags.
pub mod tag {
    pub const HELLO: u8 = 0x01;
    pub const GOODBYE: u8 = 0x02;
    pub const RESET: u8 = 0x0F;
    pub const RUN: u8 = 0x10;
    pub const DISCARD: u8 = 0x2F;
    pub const PULL: u8 = 0x3F;
    /// Bolt 4.3+
    pub const ROUTE: u8 = 0x66;

    pub const SUCCESS: u8 = 0x70;
    pub const RECORD: u8 = 0x71;
    pub const IGNORED: u8 = 0x7E;
    pub const FAILURE: u8 = 0x7F;
}
