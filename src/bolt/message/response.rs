//! Response messages, sent from server to client.

use std::collections::HashMap;

use super::tag;
use crate::bolt::packstream::{PackStreamError, PackStreamStructure, PackStreamValue};

/// Responses the server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    Success(Success),
    /// One row of the current result, values in field order.
    Record(Vec<PackStreamValue>),
    /// The request was skipped because an earlier one failed.
    Ignored,
    Failure(Failure),
}

impl BoltResponse {
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Ignored => "IGNORED",
            BoltResponse::Failure(_) => "FAILURE",
        }
    }

    /// Interpret a decoded structure; unknown tags are rejected.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.tag {
            tag::SUCCESS => {
                s.expect_arity("SUCCESS", &[1])?;
                let metadata = s.into_fields("SUCCESS").next_map()?;
                Ok(BoltResponse::Success(Success { metadata }))
            }
            tag::RECORD => {
                s.expect_arity("RECORD", &[1])?;
                Ok(BoltResponse::Record(s.into_fields("RECORD").next_list()?))
            }
            tag::IGNORED => Ok(BoltResponse::Ignored),
            tag::FAILURE => {
                s.expect_arity("FAILURE", &[1])?;
                let metadata = s.into_fields("FAILURE").next_map()?;
                Ok(BoltResponse::Failure(Failure::from_metadata(&metadata)))
            }
            other => Err(PackStreamError::UnknownStructureTag(other)),
        }
    }

    pub fn into_structure(self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(s) => {
                PackStreamStructure::new(tag::SUCCESS, vec![PackStreamValue::Map(s.metadata)])
            }
            BoltResponse::Record(values) => {
                PackStreamStructure::new(tag::RECORD, vec![PackStreamValue::List(values)])
            }
            BoltResponse::Ignored => PackStreamStructure::new(tag::IGNORED, Vec::new()),
            BoltResponse::Failure(f) => {
                let metadata = HashMap::from([
                    ("code".to_string(), PackStreamValue::String(f.code)),
                    ("message".to_string(), PackStreamValue::String(f.message)),
                ]);
                PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Map(metadata)])
            }
        }
    }
}

/// SUCCESS summary with its metadata map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Success {
    pub metadata: HashMap<String, PackStreamValue>,
}

impl Success {
    pub fn new(metadata: HashMap<String, PackStreamValue>) -> Self {
        Self { metadata }
    }

    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Column names announced in reply to RUN.
    pub fn fields(&self) -> Vec<String> {
        self.metadata
            .get("fields")
            .and_then(|v| v.as_list())
            .map(|list| list.iter().filter_map(|f| f.as_str().map(str::to_owned)).collect())
            .unwrap_or_default()
    }

    /// Set by the server when a PULL stopped before the end of the result.
    pub fn has_more(&self) -> bool {
        self.metadata.get("has_more").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn server(&self) -> Option<&str> {
        self.get_str("server")
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.get_str("connection_id")
    }

    pub fn bookmark(&self) -> Option<&str> {
        self.get_str("bookmark")
    }

    pub fn database(&self) -> Option<&str> {
        self.get_str("db")
    }

    /// `r`, `w`, `rw` or `s`.
    pub fn query_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Milliseconds until the first record was available.
    pub fn t_first(&self) -> Option<i64> {
        self.metadata.get("t_first").and_then(|v| v.as_int())
    }

    /// Milliseconds until the last record was consumed.
    pub fn t_last(&self) -> Option<i64> {
        self.metadata.get("t_last").and_then(|v| v.as_int())
    }

    pub fn stats(&self) -> Option<&HashMap<String, PackStreamValue>> {
        self.metadata.get("stats").and_then(|v| v.as_map())
    }
}

/// FAILURE summary: a Neo4j status code and a human readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

impl Failure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    fn from_metadata(metadata: &HashMap<String, PackStreamValue>) -> Self {
        let text = |key: &str| metadata.get(key).and_then(|v| v.as_str()).map(str::to_owned);
        // Bolt 5.7+ renames `code` to `neo4j_code`.
        let code = text("code")
            .or_else(|| text("neo4j_code"))
            .unwrap_or_else(|| "Neo.DatabaseError.General.UnknownError".to_string());
        Self {
            code,
            message: text("message").unwrap_or_default(),
        }
    }
}
