//! Client for a remote Graph Data Science server
//!
//! The server does all graph computation; this crate is the dispatch layer
//! that turns structured call paths into remote procedure invocations. Small
//! results travel over Bolt as Cypher calls, bulk data over Arrow Flight
//! when the server offers it.
//!
//! ```no_run
//! use graphlink::{GraphLink, GraphLinkConfig};
//! use serde_json::json;
//!
//! # async fn run() -> graphlink::Result<()> {
//! let client = GraphLink::connect(GraphLinkConfig {
//!     uri: "neo4j://localhost:7687".to_string(),
//!     user: "neo4j".to_string(),
//!     password: "secret".to_string(),
//!     ..GraphLinkConfig::default()
//! })
//! .await?;
//!
//! let (graph, _) = client
//!     .graph()
//!     .project("persons", json!("Person"), json!("KNOWS"), json!({}))
//!     .await?;
//!
//! let scores = client
//!     .call("gds.pageRank")?
//!     .stream(graph.name(), json!({"maxIterations": 20}))
//!     .await?;
//! println!("{} rows", scores.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod graph_object;
pub mod model;
pub mod procedure;
pub mod runner;

#[cfg(test)]
mod testing;

pub use catalog::GraphCatalog;
pub use client::{ArrowPreference, GraphLink, GraphLinkConfig};
pub use graph_object::Graph;
pub use model::{Model, ModelCatalog};
pub use procedure::ProcedureCaller;
pub use runner::GdsRunner;

pub use graphlink_core::error::{ClientError, Result};
pub use graphlink_core::params::CallParameters;
pub use graphlink_core::spec::{FieldKind, FieldSpec, ProcedureSpec};
pub use graphlink_core::table::ResultTable;
pub use graphlink_core::version::ServerVersion;
