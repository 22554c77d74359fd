//! Commit outcomes and the run summary
//!
//! Store failures are recorded per item and never abort a pass. Soft skips
//! (user-chosen or duplicate safety net) are successes with their own lines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one item (or one of its documents) during a commit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum OutcomeKind {
    Created { asset_id: String },
    Updated { asset_id: String, fields: usize },
    Attached { parent_id: String, attachment_id: String },
    AttachmentUpdated { attachment_id: String },
    DocumentUploaded { owner_id: String, file_name: String },
    Skipped { reason: String },
    Failed { error: String },
}

/// One line of the commit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub item_id: Uuid,
    pub name: String,
    pub kind: OutcomeKind,
}

/// A failed store call, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub name: String,
    pub error: String,
}

/// Overall result classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Counts and failures for one commit run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub created: usize,
    pub updated: usize,
    pub attached: usize,
    pub skipped: usize,
    pub documents_uploaded: usize,
    pub failures: Vec<ItemFailure>,
    pub outcomes: Vec<CommitOutcome>,
}

impl CommitSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome line and bump the matching counter
    pub fn record(&mut self, item_id: Uuid, name: impl Into<String>, kind: OutcomeKind) {
        let name = name.into();
        match &kind {
            OutcomeKind::Created { .. } => self.created += 1,
            OutcomeKind::Updated { .. } => self.updated += 1,
            OutcomeKind::Attached { .. } | OutcomeKind::AttachmentUpdated { .. } => {
                self.attached += 1
            }
            OutcomeKind::DocumentUploaded { .. } => self.documents_uploaded += 1,
            OutcomeKind::Skipped { .. } => self.skipped += 1,
            OutcomeKind::Failed { error } => self.failures.push(ItemFailure {
                name: name.clone(),
                error: error.clone(),
            }),
        }
        self.outcomes.push(CommitOutcome {
            item_id,
            name,
            kind,
        });
    }

    /// Item-level successes, soft skips included
    pub fn success_count(&self) -> usize {
        self.created + self.updated + self.attached + self.skipped
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn status(&self) -> SummaryStatus {
        if self.failures.is_empty() {
            SummaryStatus::AllSucceeded
        } else if self.success_count() == 0 {
            SummaryStatus::AllFailed
        } else {
            SummaryStatus::Partial
        }
    }

    pub fn title(&self) -> &'static str {
        match self.status() {
            SummaryStatus::AllSucceeded => "Import Complete",
            SummaryStatus::Partial => "Partial Import",
            SummaryStatus::AllFailed => "Import Failed",
        }
    }

    /// One-paragraph description for a toast or CLI
    pub fn message(&self) -> String {
        let mut parts = Vec::new();
        if self.created > 0 {
            parts.push(format!("{} created", self.created));
        }
        if self.updated > 0 {
            parts.push(format!("{} updated", self.updated));
        }
        if self.attached > 0 {
            parts.push(format!("{} attachments", self.attached));
        }
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if self.documents_uploaded > 0 {
            parts.push(format!("{} documents", self.documents_uploaded));
        }
        let counts = if parts.is_empty() {
            "Nothing written".to_string()
        } else {
            parts.join(", ")
        };

        match self.status() {
            SummaryStatus::AllSucceeded => counts,
            SummaryStatus::Partial | SummaryStatus::AllFailed => {
                let mut names: Vec<&str> = self.failures.iter().map(|f| f.name.as_str()).collect();
                names.dedup();
                format!("{}. Failed: {}", counts, names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary_is_complete() {
        let summary = CommitSummary::new();
        assert_eq!(summary.status(), SummaryStatus::AllSucceeded);
        assert_eq!(summary.title(), "Import Complete");
        assert_eq!(summary.message(), "Nothing written");
    }

    #[test]
    fn test_one_success_one_failure_is_partial() {
        let mut summary = CommitSummary::new();
        summary.record(
            Uuid::new_v4(),
            "2021 CAT 305",
            OutcomeKind::Failed {
                error: "store offline".to_string(),
            },
        );
        summary.record(
            Uuid::new_v4(),
            "Bobcat S650",
            OutcomeKind::Updated {
                asset_id: "a1".to_string(),
                fields: 2,
            },
        );

        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.status(), SummaryStatus::Partial);
        assert_eq!(summary.title(), "Partial Import");
        assert!(summary.message().contains("Failed: 2021 CAT 305"));
    }

    #[test]
    fn test_only_failures_is_all_failed() {
        let mut summary = CommitSummary::new();
        summary.record(
            Uuid::new_v4(),
            "Kubota SVL75",
            OutcomeKind::Failed {
                error: "timeout".to_string(),
            },
        );
        assert_eq!(summary.status(), SummaryStatus::AllFailed);
        assert_eq!(summary.title(), "Import Failed");
    }
}
