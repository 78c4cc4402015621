//! PackStream marker bytes and structure tags.
//!
//! Every PackStream value starts with a marker byte. Small strings, lists,
//! maps and structures pack their size into the low nibble of the marker;
//! larger ones follow the marker with a big-endian size of 1, 2 or 4 bytes.

pub const NULL: u8 = 0xC0;
pub const FLOAT_64: u8 = 0xC1;
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

pub const TINY_STRING: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

pub const TINY_LIST: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

pub const TINY_MAP: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

pub const TINY_STRUCT: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Largest size that fits in the low nibble of a tiny marker.
pub const TINY_SIZE_MAX: usize = 0x0F;

/// Range of integers encoded directly in the marker byte.
pub const TINY_INT_RANGE: std::ops::RangeInclusive<i64> = -16..=127;

/// Structure tags of the value types exchanged inside records and parameters.
pub mod tag {
    pub const NODE: u8 = b'N';
    pub const RELATIONSHIP: u8 = b'R';
    pub const UNBOUND_RELATIONSHIP: u8 = b'r';
    pub const PATH: u8 = b'P';

    pub const DATE: u8 = b'D';
    pub const TIME: u8 = b'T';
    pub const LOCAL_TIME: u8 = b't';
    /// Offset date-time, seconds counted in UTC (Bolt 5).
    pub const DATE_TIME: u8 = b'I';
    /// Zoned date-time, seconds counted in UTC (Bolt 5).
    pub const DATE_TIME_ZONE_ID: u8 = b'i';
    /// Offset date-time, seconds counted in local time (Bolt 4).
    pub const LEGACY_DATE_TIME: u8 = b'F';
    /// Zoned date-time, seconds counted in local time (Bolt 4).
    pub const LEGACY_DATE_TIME_ZONE_ID: u8 = b'f';
    pub const LOCAL_DATE_TIME: u8 = b'd';
    pub const DURATION: u8 = b'E';

    pub const POINT_2D: u8 = b'X';
    pub const POINT_3D: u8 = b'Y';
}

/// Width of the size field that follows a sized marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeWidth {
    /// Size is packed into the marker itself.
    Tiny(usize),
    U8,
    U16,
    U32,
}

/// What a marker byte announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Null,
    Boolean(bool),
    Float,
    TinyInt(i8),
    Int8,
    Int16,
    Int32,
    Int64,
    Bytes(SizeWidth),
    String(SizeWidth),
    List(SizeWidth),
    Map(SizeWidth),
    Struct(SizeWidth),
}

impl Marker {
    /// Classify a marker byte, returning `None` for reserved bytes.
    pub fn classify(byte: u8) -> Option<Self> {
        let nibble = (byte & 0x0F) as usize;
        let marker = match byte {
            0x00..=0x7F | 0xF0..=0xFF => Marker::TinyInt(byte as i8),
            0x80..=0x8F => Marker::String(SizeWidth::Tiny(nibble)),
            0x90..=0x9F => Marker::List(SizeWidth::Tiny(nibble)),
            0xA0..=0xAF => Marker::Map(SizeWidth::Tiny(nibble)),
            0xB0..=0xBF => Marker::Struct(SizeWidth::Tiny(nibble)),
            NULL => Marker::Null,
            FLOAT_64 => Marker::Float,
            FALSE => Marker::Boolean(false),
            TRUE => Marker::Boolean(true),
            INT_8 => Marker::Int8,
            INT_16 => Marker::Int16,
            INT_32 => Marker::Int32,
            INT_64 => Marker::Int64,
            BYTES_8 => Marker::Bytes(SizeWidth::U8),
            BYTES_16 => Marker::Bytes(SizeWidth::U16),
            BYTES_32 => Marker::Bytes(SizeWidth::U32),
            STRING_8 => Marker::String(SizeWidth::U8),
            STRING_16 => Marker::String(SizeWidth::U16),
            STRING_32 => Marker::String(SizeWidth::U32),
            LIST_8 => Marker::List(SizeWidth::U8),
            LIST_16 => Marker::List(SizeWidth::U16),
            LIST_32 => Marker::List(SizeWidth::U32),
            MAP_8 => Marker::Map(SizeWidth::U8),
            MAP_16 => Marker::Map(SizeWidth::U16),
            MAP_32 => Marker::Map(SizeWidth::U32),
            STRUCT_8 => Marker::Struct(SizeWidth::U8),
            STRUCT_16 => Marker::Struct(SizeWidth::U16),
            _ => return None,
        };
        Some(marker)
    }
}
