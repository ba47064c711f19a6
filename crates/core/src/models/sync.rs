//! Per-pair results, run summaries and the persisted run log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Context;

/// Why a (configuration, context) pair did not complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum PairFailure {
    DirectoryUnavailable(String),
    EmptyDirectoryResult,
    ContextNotConfigured,
    Store(String),
}

impl std::fmt::Display for PairFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairFailure::DirectoryUnavailable(msg) => write!(f, "directory unavailable: {msg}"),
            PairFailure::EmptyDirectoryResult => f.write_str("directory returned no users"),
            PairFailure::ContextNotConfigured => f.write_str("context not configured"),
            PairFailure::Store(msg) => write!(f, "local store error: {msg}"),
        }
    }
}

/// Outcome of one (configuration, context) pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairReport {
    pub configuration_uid: u32,
    pub configuration_name: String,
    pub context: Context,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub restored: usize,
    pub disabled: usize,
    pub deleted: usize,
    pub failure: Option<PairFailure>,
}

impl PairReport {
    pub fn new(configuration_uid: u32, configuration_name: &str, context: Context) -> Self {
        Self {
            configuration_uid,
            configuration_name: configuration_name.to_string(),
            context,
            fetched: 0,
            created: 0,
            updated: 0,
            restored: 0,
            disabled: 0,
            deleted: 0,
            failure: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Summary of a whole task run across all pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub pairs: Vec<PairReport>,
    pub failures: u32,
    pub committed: bool,
    pub dry_run: bool,
}

impl RunSummary {
    /// Human-readable failure lines, one per failed pair.
    pub fn error_details(&self) -> Option<String> {
        let lines: Vec<String> = self
            .pairs
            .iter()
            .filter_map(|p| {
                p.failure.as_ref().map(|f| {
                    format!(
                        "configuration {} ({}): {f}",
                        p.configuration_uid, p.context
                    )
                })
            })
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Status of a logged sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Running,
    Completed,
    Failed,
}

/// A sync run record, kept outside the sync transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRun {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SyncRunStatus,
    pub pairs: i64,
    pub failures: i64,
    pub error_details: Option<String>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_run_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SyncRunStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&SyncRunStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn error_details_lists_failed_pairs_only() {
        let ok = PairReport::new(1, "Main", Context::Fe);
        let mut failed = PairReport::new(2, "Branch", Context::Be);
        failed.failure = Some(PairFailure::EmptyDirectoryResult);
        let summary = RunSummary {
            pairs: vec![ok, failed],
            failures: 1,
            committed: false,
            dry_run: false,
        };
        assert_eq!(
            summary.error_details().as_deref(),
            Some("configuration 2 (be): directory returned no users")
        );
    }

    #[test]
    fn no_failures_no_details() {
        let summary = RunSummary {
            pairs: vec![PairReport::new(1, "Main", Context::Fe)],
            ..Default::default()
        };
        assert!(summary.error_details().is_none());
    }

    #[test]
    fn pair_failure_serializes_with_kind() {
        let json =
            serde_json::to_string(&PairFailure::DirectoryUnavailable("bind rejected".into()))
                .unwrap();
        assert_eq!(
            json,
            "{\"kind\":\"directory_unavailable\",\"message\":\"bind rejected\"}"
        );
    }
}
