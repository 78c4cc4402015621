//! PackStream value model.

use std::collections::HashMap;

use super::PackStreamError;

/// A value as it travels over the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<PackStreamValue>),
    Map(HashMap<String, PackStreamValue>),
    /// Tagged structure: messages, graph entities, temporal and spatial values.
    Structure(PackStreamStructure),
}

/// A tagged structure with positional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamStructure {
    pub tag: u8,
    pub fields: Vec<PackStreamValue>,
}

impl PackStreamStructure {
    pub fn new(tag: u8, fields: Vec<PackStreamValue>) -> Self {
        Self { tag, fields }
    }

    /// Check the field count against the accepted arities of the named structure.
    pub fn expect_arity(&self, name: &'static str, accepted: &[usize]) -> Result<(), PackStreamError> {
        if accepted.contains(&self.fields.len()) {
            Ok(())
        } else {
            Err(PackStreamError::InvalidStructure(format!(
                "{} with {} fields (expected {:?})",
                name,
                self.fields.len(),
                accepted
            )))
        }
    }

    /// Iterate over the fields by value, reporting missing ones by structure name.
    pub fn into_fields(self, name: &'static str) -> StructFields {
        StructFields {
            name,
            fields: self.fields.into_iter(),
        }
    }
}

/// Typed, positional access to the fields of a structure being decoded.
pub struct StructFields {
    name: &'static str,
    fields: std::vec::IntoIter<PackStreamValue>,
}

impl StructFields {
    pub fn next_value(&mut self) -> Result<PackStreamValue, PackStreamError> {
        self.fields
            .next()
            .ok_or_else(|| PackStreamError::InvalidStructure(format!("{} is missing a field", self.name)))
    }

    pub fn next_int(&mut self) -> Result<i64, PackStreamError> {
        match self.next_value()? {
            PackStreamValue::Integer(i) => Ok(i),
            other => Err(self.mismatch("Integer", &other)),
        }
    }

    pub fn next_float(&mut self) -> Result<f64, PackStreamError> {
        match self.next_value()? {
            PackStreamValue::Float(f) => Ok(f),
            other => Err(self.mismatch("Float", &other)),
        }
    }

    pub fn next_string(&mut self) -> Result<String, PackStreamError> {
        match self.next_value()? {
            PackStreamValue::String(s) => Ok(s),
            other => Err(self.mismatch("String", &other)),
        }
    }

    pub fn next_list(&mut self) -> Result<Vec<PackStreamValue>, PackStreamError> {
        match self.next_value()? {
            PackStreamValue::List(l) => Ok(l),
            other => Err(self.mismatch("List", &other)),
        }
    }

    pub fn next_map(&mut self) -> Result<HashMap<String, PackStreamValue>, PackStreamError> {
        match self.next_value()? {
            PackStreamValue::Map(m) => Ok(m),
            other => Err(self.mismatch("Map", &other)),
        }
    }

    /// Next field if present; structures grow trailing fields between protocol versions.
    pub fn next_optional(&mut self) -> Option<PackStreamValue> {
        self.fields.next()
    }

    fn mismatch(&self, expected: &str, found: &PackStreamValue) -> PackStreamError {
        PackStreamError::InvalidStructure(format!(
            "{} field: expected {}, found {}",
            self.name,
            expected,
            found.type_name()
        ))
    }
}

impl PackStreamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PackStreamValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PackStreamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PackStreamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackStreamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        match self {
            PackStreamValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, PackStreamValue>> {
        match self {
            PackStreamValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PackStreamValue::Null => "Null",
            PackStreamValue::Boolean(_) => "Boolean",
            PackStreamValue::Integer(_) => "Integer",
            PackStreamValue::Float(_) => "Float",
            PackStreamValue::Bytes(_) => "Bytes",
            PackStreamValue::String(_) => "String",
            PackStreamValue::List(_) => "List",
            PackStreamValue::Map(_) => "Map",
            PackStreamValue::Structure(_) => "Structure",
        }
    }
}

impl From<bool> for PackStreamValue {
    fn from(v: bool) -> Self {
        PackStreamValue::Boolean(v)
    }
}

impl From<i64> for PackStreamValue {
    fn from(v: i64) -> Self {
        PackStreamValue::Integer(v)
    }
}

impl From<f64> for PackStreamValue {
    fn from(v: f64) -> Self {
        PackStreamValue::Float(v)
    }
}

impl From<&str> for PackStreamValue {
    fn from(v: &str) -> Self {
        PackStreamValue::String(v.to_owned())
    }
}

impl From<String> for PackStreamValue {
    fn from(v: String) -> Self {
        PackStreamValue::String(v)
    }
}

impl From<Vec<PackStreamValue>> for PackStreamValue {
    fn from(v: Vec<PackStreamValue>) -> Self {
        PackStreamValue::List(v)
    }
}

impl From<HashMap<String, PackStreamValue>> for PackStreamValue {
    fn from(v: HashMap<String, PackStreamValue>) -> Self {
        PackStreamValue::Map(v)
    }
}

impl From<PackStreamStructure> for PackStreamValue {
    fn from(v: PackStreamStructure) -> Self {
        PackStreamValue::Structure(v)
    }
}
