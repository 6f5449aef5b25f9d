//! The transport seam
//!
//! Everything above the wire talks to a [`QueryRunner`]. The Cypher runner
//! implements it directly; the facade wraps it with a transport-selecting
//! runner that reroutes bulk endpoints over Arrow Flight.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::params::CallParameters;
use crate::table::ResultTable;
use crate::version::ServerVersion;

#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Runs a raw Cypher query with named parameters.
    async fn run_cypher(&self, query: &str, params: CallParameters) -> Result<ResultTable>;

    /// Calls `CALL <endpoint>(<params>)`, optionally with a YIELD clause.
    async fn call_procedure(
        &self,
        endpoint: &str,
        params: CallParameters,
        yields: Option<&[&str]>,
    ) -> Result<ResultTable>;

    /// Calls `RETURN <endpoint>(<params>)` and returns the single value.
    async fn call_function(&self, endpoint: &str, params: CallParameters) -> Result<Value>;

    fn server_version(&self) -> ServerVersion;

    fn database(&self) -> Option<&str>;
}
