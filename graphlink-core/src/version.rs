//! Server version parsing and comparison

use crate::error::{ClientError, Result};

/// The oldest server version this client is tested against.
pub const MIN_SERVER_VERSION: ServerVersion = ServerVersion::new(2, 1, 0);

/// The server version from which tiered (`alpha`/`beta`) procedures are
/// resolved against their promoted top-level names.
pub const TIERS_DROPPED_VERSION: ServerVersion = ServerVersion::new(2, 5, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses versions like `2.5.0` or `2.6.0-alpha01`; pre-release and build
    /// suffixes are ignored for ordering.
    pub fn from_string(version: &str) -> Result<Self> {
        let core = version
            .split(|c| c == '-' || c == '+')
            .next()
            .unwrap_or(version);

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(ClientError::ServerVersion(format!(
                "cannot parse server version from `{version}`"
            )));
        }

        let parse = |s: &str| {
            s.parse::<u32>().map_err(|_| {
                ClientError::ServerVersion(format!("cannot parse server version from `{version}`"))
            })
        };

        Ok(Self {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
        })
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
