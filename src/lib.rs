//! # Neo4j Bolt Driver
//!
//! An async client for graph databases that speak the Bolt protocol.
//!
//! ## Features
//!
//! - **Bolt 5.0 / 4.4** - PackStream codec, chunked framing and version negotiation
//! - **Cluster routing** - writes go to the leader, reads are spread over followers and read replicas
//! - **Connection pooling** - a bounded pool per server address
//! - **Async/Await** - built on Tokio
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use neo4j_bolt_driver::{new_driver, params, AccessMode, DriverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = new_driver(DriverConfig::new("neo4j://localhost:7687", "neo4j", "password"))?;
//!
//!     driver
//!         .write(
//!             "CREATE (p:Person {name: $name, country: $country, year: $year}) RETURN p",
//!             Some(params! { "name" => "Errico", "country" => "Italia", "year" => 1853 }),
//!         )
//!         .await?;
//!
//!     let result = driver
//!         .execute_query(
//!             AccessMode::Read,
//!             "MATCH (p:Person) WHERE p.name = $name RETURN p",
//!             Some(params! { "name" => "Errico" }),
//!         )
//!         .await?;
//!
//!     // [{"values":[...],"keys":["p"]}]
//!     println!("{}", serde_json::to_string(&result)?);
//!
//!     driver.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Access Modes
//!
//! At integer boundaries the access mode is `0` for WRITE and `1` for READ:
//!
//! ```rust
//! use neo4j_bolt_driver::AccessMode;
//!
//! assert_eq!(AccessMode::try_from(0).unwrap(), AccessMode::Write);
//! assert_eq!(AccessMode::try_from(1).unwrap(), AccessMode::Read);
//! assert!(AccessMode::try_from(2).is_err());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use neo4j_bolt_driver::DriverConfig;
//! use std::time::Duration;
//!
//! let config = DriverConfig::builder("neo4j://localhost:7687", "neo4j", "password")
//!     .with_max_connection_pool_size(50)
//!     .with_connection_acquisition_timeout(Duration::from_secs(10))
//!     .build();
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - driver, pool, routing and session
//! - [`bolt`] - low-level Bolt protocol implementation

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use driver::{
    new_driver, AccessMode, AuthToken, Counters, Driver, DriverConfig, DriverConfigBuilder, DriverError,
    DriverMetrics, DriverResult, EagerResult, Node, Query, Record, Relationship, ResultSummary, ServerAddress,
    Session, SessionConfig, Value,
};

pub use bolt::{BoltError, BoltVersion, PackStreamValue};

/// Config alias for convenience
pub type Config = DriverConfig;
