//! Dotted procedure namespace resolution
//!
//! The server exposes its callable surface as dotted identifiers such as
//! `gds.pageRank.mutate`. Callers grow a [`ProcedureNamespace`] one segment at
//! a time and render it into the procedure name that goes on the wire.

use crate::error::{ClientError, Result};

/// Tier prefixes that newer servers dropped from their procedure names.
const TIER_SEGMENTS: [&str; 2] = ["alpha", "beta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureNamespace {
    segments: Vec<String>,
}

impl ProcedureNamespace {
    /// A namespace rooted at the given segment, usually `gds`.
    pub fn root(segment: impl Into<String>) -> Result<Self> {
        let mut ns = Self { segments: vec![] };
        ns.push(segment)?;
        Ok(ns)
    }

    /// Parses a full dotted name, validating every segment.
    pub fn parse(dotted: &str) -> Result<Self> {
        let mut ns = Self { segments: vec![] };
        for segment in dotted.split('.') {
            ns.push(segment)?;
        }
        Ok(ns)
    }

    fn push(&mut self, segment: impl Into<String>) -> Result<()> {
        let segment = segment.into();
        if segment.is_empty()
            || !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ClientError::InvalidNamespace(format!(
                "invalid segment `{segment}` in `{}`",
                self.to_dotted()
            )));
        }
        self.segments.push(segment);
        Ok(())
    }

    /// Extends the namespace with one more segment.
    pub fn append(&self, segment: impl Into<String>) -> Result<Self> {
        let mut next = self.clone();
        next.push(segment)?;
        Ok(next)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The dotted procedure name, e.g. `gds.pageRank.stream`.
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// The same namespace without `alpha`/`beta` tier segments.
    ///
    /// Servers from 2.5 onwards promoted the tiered procedures to the
    /// top-level namespace; resolving against such a server means calling the
    /// promoted name.
    pub fn without_tier(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .filter(|s| !TIER_SEGMENTS.contains(&s.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// The memory-estimation variant of this endpoint.
    pub fn estimate(&self) -> String {
        format!("{}.estimate", self.to_dotted())
    }
}

impl std::fmt::Display for ProcedureNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_builds_dotted_name() {
        let ns = ProcedureNamespace::root("gds")
            .unwrap()
            .append("pageRank")
            .unwrap()
            .append("mutate")
            .unwrap();

        assert_eq!(ns.to_dotted(), "gds.pageRank.mutate");
    }

    #[test]
    fn test_parse_round_trips() {
        let ns = ProcedureNamespace::parse("gds.graph.nodeProperties.stream").unwrap();
        assert_eq!(ns.segments().len(), 4);
        assert_eq!(ns.to_dotted(), "gds.graph.nodeProperties.stream");
    }

    #[test]
    fn test_invalid_segments_rejected() {
        assert!(ProcedureNamespace::parse("gds..stream").is_err());
        assert!(ProcedureNamespace::parse("gds.page-rank").is_err());
        assert!(ProcedureNamespace::root("").is_err());
    }

    #[test]
    fn test_tier_stripping() {
        let ns = ProcedureNamespace::parse("gds.beta.model.drop").unwrap();
        assert_eq!(ns.without_tier().to_dotted(), "gds.model.drop");

        let untouched = ProcedureNamespace::parse("gds.pageRank.stats").unwrap();
        assert_eq!(untouched.without_tier(), untouched);
    }

    #[test]
    fn test_estimate_suffix() {
        let ns = ProcedureNamespace::parse("gds.wcc.mutate").unwrap();
        assert_eq!(ns.estimate(), "gds.wcc.mutate.estimate");
    }
}
