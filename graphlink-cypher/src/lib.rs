//! Graphlink Cypher Transport
//! ==========================
//!
//! The Bolt side of the graphlink client:
//! - `CypherRunner`, a `QueryRunner` over a `neo4rs` driver
//! - Procedure-call assembly (`CALL …`, `RETURN …`, `YIELD …`)
//! - Connectivity verification with retries
//! - Unknown-procedure suggestions from the installed endpoint list
//! - Job progress polling via `gds.listProgress`

pub mod convert;
pub mod progress;
pub mod runner;
pub mod suggest;

pub use progress::ProgressPoller;
pub use runner::{
    assemble_function_call, assemble_procedure_call, CypherConfig, CypherRunner,
};
pub use suggest::suggestive_error_message;
