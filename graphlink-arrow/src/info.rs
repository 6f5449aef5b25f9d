//! Arrow server discovery

use serde::Deserialize;

use graphlink_core::error::{ClientError, Result};
use graphlink_core::table::ResultTable;

/// What `gds.debug.arrow()` reports about the server's Flight endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowInfo {
    pub enabled: bool,
    pub running: bool,
    pub listen_address: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

impl ArrowInfo {
    pub fn from_table(table: &ResultTable) -> Result<Self> {
        let row = table.single_row()?;
        Ok(serde_json::from_value(serde_json::Value::Object(
            row.clone(),
        ))?)
    }

    /// Whether the client can open a Flight connection at all.
    pub fn available(&self) -> bool {
        self.enabled && self.running && self.listen_address.is_some()
    }

    /// Splits `listenAddress` into host and port.
    pub fn host_and_port(&self) -> Result<(String, u16)> {
        let address = self
            .listen_address
            .as_deref()
            .ok_or_else(|| ClientError::Config("Arrow server has no listen address".to_string()))?;

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| ClientError::Config(format!("invalid listen address `{address}`")))?;

        let port = port
            .parse::<u16>()
            .map_err(|_| ClientError::Config(format!("invalid listen address `{address}`")))?;

        Ok((host.to_string(), port))
    }
}
