//! Bolt protocol client for the driver.
//!
//! The wire types live in [`crate::bolt`]; this module adds the pieces that
//! only a client needs.
//!
//! ```text
//! ConnectionPool
//!   └── BoltClient        lifecycle (ConnectionState), HELLO/RUN/PULL/RESET/ROUTE
//!         └── BoltConnection   TCP, handshake, chunked framing (BoltClientCodec)
//! ```

pub mod client;
pub mod connection;
pub mod state;

pub use client::{BoltClient, ConnectOptions};
pub use connection::BoltConnection;
pub use state::{ConnectionEvent, ConnectionState, IllegalTransition};

/// User agent sent in HELLO unless the configuration overrides it.
pub const CLIENT_USER_AGENT: &str = concat!("neo4j-bolt-driver/", env!("CARGO_PKG_VERSION"));
