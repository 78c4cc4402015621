//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Serializes values into a borrowed buffer.
pub struct PackStreamEncoder<'a> {
    buf: &'a mut BytesMut,
}

/// Markers of one sized family: tiny base, then 8/16/32-bit size variants.
struct SizedMarkers {
    kind: &'static str,
    tiny: Option<u8>,
    m8: u8,
    m16: u8,
    m32: Option<u8>,
}

const BYTES: SizedMarkers = SizedMarkers { kind: "bytes", tiny: None, m8: BYTES_8, m16: BYTES_16, m32: Some(BYTES_32) };
const STRING: SizedMarkers = SizedMarkers { kind: "string", tiny: Some(TINY_STRING), m8: STRING_8, m16: STRING_16, m32: Some(STRING_32) };
const LIST: SizedMarkers = SizedMarkers { kind: "list", tiny: Some(TINY_LIST), m8: LIST_8, m16: LIST_16, m32: Some(LIST_32) };
const MAP: SizedMarkers = SizedMarkers { kind: "map", tiny: Some(TINY_MAP), m8: MAP_8, m16: MAP_16, m32: Some(MAP_32) };
const STRUCT: SizedMarkers = SizedMarkers { kind: "structure", tiny: Some(TINY_STRUCT), m8: STRUCT_8, m16: STRUCT_16, m32: None };

impl<'a> PackStreamEncoder<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    pub fn write(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => self.buf.put_u8(NULL),
            PackStreamValue::Boolean(b) => self.buf.put_u8(if *b { TRUE } else { FALSE }),
            PackStreamValue::Integer(i) => self.write_int(*i),
            PackStreamValue::Float(f) => {
                self.buf.put_u8(FLOAT_64);
                self.buf.put_f64(*f);
            }
            PackStreamValue::Bytes(b) => {
                self.write_header(&BYTES, b.len())?;
                self.buf.put_slice(b);
            }
            PackStreamValue::String(s) => self.write_string(s)?,
            PackStreamValue::List(items) => {
                self.write_header(&LIST, items.len())?;
                for item in items {
                    self.write(item)?;
                }
            }
            PackStreamValue::Map(entries) => {
                self.write_header(&MAP, entries.len())?;
                for (key, item) in entries {
                    self.write_string(key)?;
                    self.write(item)?;
                }
            }
            PackStreamValue::Structure(s) => self.write_structure(s)?,
        }
        Ok(())
    }

    pub fn write_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        self.write_header(&STRUCT, s.fields.len())?;
        self.buf.put_u8(s.tag);
        for field in &s.fields {
            self.write(field)?;
        }
        Ok(())
    }

    /// Integers always take the smallest form that holds them.
    fn write_int(&mut self, value: i64) {
        if TINY_INT_RANGE.contains(&value) {
            self.buf.put_i8(value as i8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buf.put_u8(INT_8);
            self.buf.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buf.put_u8(INT_16);
            self.buf.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buf.put_u8(INT_32);
            self.buf.put_i32(v);
        } else {
            self.buf.put_u8(INT_64);
            self.buf.put_i64(value);
        }
    }

    fn write_string(&mut self, s: &str) -> Result<(), PackStreamError> {
        self.write_header(&STRING, s.len())?;
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn write_header(&mut self, markers: &SizedMarkers, len: usize) -> Result<(), PackStreamError> {
        match markers.tiny {
            Some(base) if len <= TINY_SIZE_MAX => {
                self.buf.put_u8(base | len as u8);
                return Ok(());
            }
            _ => {}
        }
        if let Ok(n) = u8::try_from(len) {
            self.buf.put_u8(markers.m8);
            self.buf.put_u8(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buf.put_u8(markers.m16);
            self.buf.put_u16(n);
        } else {
            match (markers.m32, u32::try_from(len)) {
                (Some(m32), Ok(n)) => {
                    self.buf.put_u8(m32);
                    self.buf.put_u32(n);
                }
                _ => return Err(PackStreamError::ValueTooLarge(markers.kind, len)),
            }
        }
        Ok(())
    }
}

/// Encode a single value into a fresh buffer.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut buf = BytesMut::with_capacity(64);
    PackStreamEncoder::new(&mut buf).write(value)?;
    Ok(buf)
}
