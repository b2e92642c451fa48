//! Hand-off of structured findings to an external reasoning service.
//!
//! The engine never depends on the oracle's answer: failures are logged and
//! turned into `None`.

use crate::aggregation::{AnalysisReport, ReportSummary};
use crate::core::Finding;
use serde::{Deserialize, Serialize};

/// Anything that can comment on a digest of findings, e.g. an LLM client.
pub trait ReasoningOracle: Send + Sync {
    fn commentary(&self, digest: &OracleDigest) -> anyhow::Result<String>;
}

/// Compact view of a report: its summary and the highest-priority findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleDigest {
    pub run_id: String,
    pub complete: bool,
    pub summary: ReportSummary,
    pub top_findings: Vec<Finding>,
}

impl OracleDigest {
    pub fn from_report(report: &AnalysisReport, n: usize) -> Self {
        Self {
            run_id: report.run_id.clone(),
            complete: report.is_complete(),
            summary: report.summary.clone(),
            top_findings: report.top_findings(n).to_vec(),
        }
    }
}

pub fn request_commentary(oracle: &dyn ReasoningOracle, digest: &OracleDigest) -> Option<String> {
    match oracle.commentary(digest) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(run_id = %digest.run_id, "Reasoning oracle failed: {:#}", e);
            None
        }
    }
}
