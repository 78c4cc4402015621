//! Request messages, sent from client to server.

use std::collections::HashMap;
use std::fmt;

use super::tag;
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

/// Requests the driver sends.
#[derive(Debug, Clone)]
pub enum BoltRequest {
    /// Initialize the connection and authenticate.
    Hello(Hello),
    /// Announce a graceful close.
    Goodbye,
    /// Clear a failure and return the connection to a clean state.
    Reset,
    /// Submit a query in an auto-commit transaction.
    Run(Run),
    /// Stream up to `n` records of the current result, `-1` for all.
    Pull { n: i64 },
    /// Drop up to `n` records of the current result, `-1` for all.
    Discard { n: i64 },
    /// Fetch the routing table of a cluster.
    Route(Route),
}

impl BoltRequest {
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Hello(_) => tag::HELLO,
            BoltRequest::Goodbye => tag::GOODBYE,
            BoltRequest::Reset => tag::RESET,
            BoltRequest::Run(_) => tag::RUN,
            BoltRequest::Pull { .. } => tag::PULL,
            BoltRequest::Discard { .. } => tag::DISCARD,
            BoltRequest::Route(_) => tag::ROUTE,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull { .. } => "PULL",
            BoltRequest::Discard { .. } => "DISCARD",
            BoltRequest::Route(_) => "ROUTE",
        }
    }

    pub fn into_structure(self) -> PackStreamStructure {
        let tag = self.tag();
        let fields = match self {
            BoltRequest::Hello(hello) => vec![hello.into_extra()],
            BoltRequest::Goodbye | BoltRequest::Reset => Vec::new(),
            BoltRequest::Run(run) => run.into_fields(),
            BoltRequest::Pull { n } | BoltRequest::Discard { n } => {
                vec![string_map([("n", PackStreamValue::Integer(n))])]
            }
            BoltRequest::Route(route) => route.into_fields(),
        };
        PackStreamStructure::new(tag, fields)
    }
}

/// HELLO: user agent, authentication token and optional routing context.
#[derive(Clone)]
pub struct Hello {
    pub user_agent: String,
    /// Auth entries (`scheme`, `principal`, `credentials`, `realm`).
    pub auth: HashMap<String, PackStreamValue>,
    /// Present for connections made on behalf of a routing driver.
    pub routing: Option<HashMap<String, String>>,
}

impl Hello {
    fn into_extra(self) -> PackStreamValue {
        let mut extra = self.auth;
        extra.insert("user_agent".into(), PackStreamValue::String(self.user_agent));
        if let Some(routing) = self.routing {
            extra.insert("routing".into(), string_values(routing));
        }
        PackStreamValue::Map(extra)
    }
}

impl fmt::Debug for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = self.auth.get("scheme").and_then(|v| v.as_str()).unwrap_or("none");
        f.debug_struct("Hello")
            .field("user_agent", &self.user_agent)
            .field("scheme", &scheme)
            .field("principal", &self.auth.get("principal").and_then(|v| v.as_str()))
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

/// RUN: query text, parameters and transaction metadata.
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub query: String,
    pub parameters: HashMap<String, PackStreamValue>,
    pub database: Option<String>,
    pub bookmarks: Vec<String>,
    /// Routes the transaction to a read server; writes are the protocol default.
    pub read_only: bool,
}

impl Run {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    fn into_fields(self) -> Vec<PackStreamValue> {
        let mut extra = HashMap::new();
        if let Some(db) = self.database {
            extra.insert("db".to_string(), PackStreamValue::String(db));
        }
        if !self.bookmarks.is_empty() {
            extra.insert(
                "bookmarks".to_string(),
                PackStreamValue::List(self.bookmarks.into_iter().map(PackStreamValue::String).collect()),
            );
        }
        if self.read_only {
            extra.insert("mode".to_string(), PackStreamValue::from("r"));
        }
        vec![
            PackStreamValue::String(self.query),
            PackStreamValue::Map(self.parameters),
            PackStreamValue::Map(extra),
        ]
    }
}

/// ROUTE in its 4.4+ shape: routing context, bookmarks and an extra map.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub routing: HashMap<String, String>,
    pub bookmarks: Vec<String>,
    pub database: Option<String>,
}

impl Route {
    fn into_fields(self) -> Vec<PackStreamValue> {
        let mut extra = HashMap::new();
        if let Some(db) = self.database {
            extra.insert("db".to_string(), PackStreamValue::String(db));
        }
        vec![
            string_values(self.routing),
            PackStreamValue::List(self.bookmarks.into_iter().map(PackStreamValue::String).collect()),
            PackStreamValue::Map(extra),
        ]
    }
}

fn string_values(map: HashMap<String, String>) -> PackStreamValue {
    PackStreamValue::Map(map.into_iter().map(|(k, v)| (k, PackStreamValue::String(v))).collect())
}

fn string_map<const N: usize>(entries: [(&str, PackStreamValue); N]) -> PackStreamValue {
    PackStreamValue::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}
