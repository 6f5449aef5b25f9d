//! Graphlink core types
//! ====================
//!
//! The shared vocabulary of the graphlink client crates:
//! - Error type and `Result` alias
//! - `ResultTable`, the row-oriented view of procedure results
//! - `CallParameters`, insertion-ordered procedure call parameters
//! - `ProcedureNamespace`, the dotted procedure-name builder
//! - `ServerVersion` parsing and compatibility constants
//! - Retry policies and job-polling schedules
//! - Procedure spec validation for testing call shapes

pub mod error;
pub mod namespace;
pub mod params;
pub mod retry;
pub mod runner;
pub mod spec;
pub mod table;
pub mod version;

pub use error::{ClientError, Result};
pub use namespace::ProcedureNamespace;
pub use params::CallParameters;
pub use retry::{retry_with_backoff, PollingSchedule, RetryPolicy};
pub use runner::QueryRunner;
pub use spec::{FieldKind, FieldSpec, ProcedureSpec};
pub use table::ResultTable;
pub use version::{ServerVersion, MIN_SERVER_VERSION, TIERS_DROPPED_VERSION};
