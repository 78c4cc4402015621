//! PackStream decoder.

use bytes::Buf;
use std::collections::HashMap;

use super::marker::{Marker, SizeWidth};
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Containers nested deeper than this are rejected instead of recursing further.
const MAX_DEPTH: usize = 256;

/// Reads values from a byte slice, advancing past each one.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    depth: usize,
}

impl<'a> PackStreamDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, depth: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn read(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let byte = self.take_u8()?;
        let marker = Marker::classify(byte).ok_or(PackStreamError::UnknownMarker(byte))?;

        let value = match marker {
            Marker::Null => PackStreamValue::Null,
            Marker::Boolean(b) => PackStreamValue::Boolean(b),
            Marker::TinyInt(i) => PackStreamValue::Integer(i64::from(i)),
            Marker::Int8 => {
                self.need(1)?;
                PackStreamValue::Integer(i64::from(self.data.get_i8()))
            }
            Marker::Int16 => {
                self.need(2)?;
                PackStreamValue::Integer(i64::from(self.data.get_i16()))
            }
            Marker::Int32 => {
                self.need(4)?;
                PackStreamValue::Integer(i64::from(self.data.get_i32()))
            }
            Marker::Int64 => {
                self.need(8)?;
                PackStreamValue::Integer(self.data.get_i64())
            }
            Marker::Float => {
                self.need(8)?;
                PackStreamValue::Float(self.data.get_f64())
            }
            Marker::Bytes(width) => {
                let len = self.size(width)?;
                PackStreamValue::Bytes(self.take_slice(len)?.to_vec())
            }
            Marker::String(width) => {
                let len = self.size(width)?;
                let raw = self.take_slice(len)?;
                let s = std::str::from_utf8(raw).map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))?;
                PackStreamValue::String(s.to_owned())
            }
            Marker::List(width) => {
                let len = self.size(width)?;
                self.nested(|d| {
                    let mut items = Vec::with_capacity(len.min(1024));
                    for _ in 0..len {
                        items.push(d.read()?);
                    }
                    Ok(PackStreamValue::List(items))
                })?
            }
            Marker::Map(width) => {
                let len = self.size(width)?;
                self.nested(|d| {
                    let mut entries = HashMap::with_capacity(len.min(1024));
                    for _ in 0..len {
                        let key = match d.read()? {
                            PackStreamValue::String(s) => s,
                            _ => return Err(PackStreamError::InvalidMapKey),
                        };
                        let value = d.read()?;
                        entries.insert(key, value);
                    }
                    Ok(PackStreamValue::Map(entries))
                })?
            }
            Marker::Struct(width) => {
                let len = self.size(width)?;
                let tag = self.take_u8()?;
                self.nested(|d| {
                    let mut fields = Vec::with_capacity(len.min(64));
                    for _ in 0..len {
                        fields.push(d.read()?);
                    }
                    Ok(PackStreamValue::Structure(PackStreamStructure::new(tag, fields)))
                })?
            }
        };
        Ok(value)
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, PackStreamError>,
    ) -> Result<T, PackStreamError> {
        if self.depth >= MAX_DEPTH {
            return Err(PackStreamError::NestingTooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn size(&mut self, width: SizeWidth) -> Result<usize, PackStreamError> {
        Ok(match width {
            SizeWidth::Tiny(n) => n,
            SizeWidth::U8 => self.take_u8()? as usize,
            SizeWidth::U16 => {
                self.need(2)?;
                self.data.get_u16() as usize
            }
            SizeWidth::U32 => {
                self.need(4)?;
                self.data.get_u32() as usize
            }
        })
    }

    fn need(&self, n: usize) -> Result<(), PackStreamError> {
        if self.data.remaining() < n {
            Err(PackStreamError::UnexpectedEof)
        } else {
            Ok(())
        }
    }

    fn take_u8(&mut self) -> Result<u8, PackStreamError> {
        self.need(1)?;
        Ok(self.data.get_u8())
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        self.need(len)?;
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }
}

/// Decode exactly one value; leftover bytes mean the frame was malformed.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    let value = decoder.read()?;
    match decoder.remaining() {
        0 => Ok(value),
        n => Err(PackStreamError::TrailingBytes(n)),
    }
}
