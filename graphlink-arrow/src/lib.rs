//! Arrow Flight transport
//!
//! Bulk data paths of the client: graph import from record batches, result
//! streaming for server-side procedures, and the v2 job protocol. The
//! Cypher transport stays responsible for everything row-oriented; this
//! crate only carries the payloads too large for Bolt.

pub mod actions;
pub mod auth;
pub mod client;
pub mod download;
pub mod info;
pub mod jobs;
pub mod upload;

pub use actions::{
    CreateDatabaseOptions, CreateGraphOptions, NodeLoadDoneResult, RelationshipLoadDoneResult,
    TripletLoadDoneResult,
};
pub use client::{clean_server_message, FlightConnectOptions, FlightConnection};
pub use info::ArrowInfo;
pub use jobs::JobStatus;
pub use upload::DEFAULT_BATCH_SIZE;
