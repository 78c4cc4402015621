//! PackStream serialization format.
//!
//! PackStream is the binary format Bolt uses for every message and value.
//! Each value starts with a marker byte; sized types (strings, bytes, lists,
//! maps, structures) carry their length either in the marker's low nibble or
//! in a big-endian field right after it.
//!
//! Structures are how Bolt extends the format: a tag byte followed by a fixed
//! number of positional fields. Messages are structures, and so are graph
//! entities (`N` node, `R` relationship, `r` unbound relationship, `P` path),
//! temporal values and points. This module only moves structures on and off
//! the wire; giving them meaning is up to the message and driver layers.

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use marker::tag;
pub use types::{PackStreamStructure, PackStreamValue, StructFields};

use std::fmt;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamError {
    /// Input ended in the middle of a value
    UnexpectedEof,
    /// Marker byte reserved by the format
    UnknownMarker(u8),
    /// String bytes are not UTF-8
    InvalidUtf8(String),
    /// Map key that is not a string
    InvalidMapKey,
    /// Value too large to encode
    ValueTooLarge(&'static str, usize),
    /// Structure with the wrong shape for its tag
    InvalidStructure(String),
    /// Structure tag not known in the current context
    UnknownStructureTag(u8),
    /// Bytes left over after a complete value
    TrailingBytes(usize),
    /// Containers nested beyond the decoder's limit
    NestingTooDeep(usize),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "Truncated PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "Unknown PackStream marker: 0x{:02X}", m),
            PackStreamError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            PackStreamError::InvalidMapKey => write!(f, "Map keys must be strings"),
            PackStreamError::ValueTooLarge(kind, len) => write!(f, "{} too large: {}", kind, len),
            PackStreamError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
            PackStreamError::UnknownStructureTag(t) => write!(f, "Unknown structure tag: 0x{:02X}", t),
            PackStreamError::TrailingBytes(n) => write!(f, "{} unexpected bytes after value", n),
            PackStreamError::NestingTooDeep(max) => write!(f, "Values nested deeper than {}", max),
        }
    }
}

impl std::error::Error for PackStreamError {}
