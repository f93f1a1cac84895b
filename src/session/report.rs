//! Summary of one session run

use crate::builder::BuildRequest;
use crate::registry::ProbeOutcome;
use crate::rewrite::RewriteReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything one `Session::run` did
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,

    /// False when substitution is disabled or the invocation did not match
    pub triggered: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOutcome>,

    /// Modules that must be built from source this time
    pub builds: Vec<BuildRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewriteReport>,

    pub duration_ms: u64,
}

impl SessionReport {
    pub(crate) fn skipped(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            triggered: false,
            probe: None,
            builds: Vec::new(),
            rewrite: None,
            duration_ms: elapsed_ms(started_at),
        }
    }

    /// Number of source dependencies replaced by artifacts
    pub fn substituted(&self) -> usize {
        self.rewrite.as_ref().map_or(0, |r| r.substituted.len())
    }
}

pub(crate) fn elapsed_ms(since: DateTime<Utc>) -> u64 {
    (Utc::now() - since).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_report_serializes_without_phases() {
        let report = SessionReport::skipped(Utc::now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["triggered"], false);
        assert!(json.get("probe").is_none());
        assert!(json.get("rewrite").is_none());
        assert_eq!(report.substituted(), 0);
    }
}
