//! Sweep report
//!
//! Accumulates one line per resource the sweep touched, plus the resource
//! types that sat the run out, and renders the closing summary.

use chrono::{DateTime, Utc};
use std::fmt;

/// What happened to one resource instance
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Removed,
    /// Dry run: removal was due but not issued
    WouldRemove,
    /// A filter vetoed removal, with its reason
    Filtered(String),
    Failed(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Removed => "removed",
            Outcome::WouldRemove => "would remove",
            Outcome::Filtered(_) => "filtered",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub kind: String,
    pub location: String,
    pub id: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub project: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    entries: Vec<ResourceEntry>,
    skipped_types: Vec<(String, String)>,
    errors: Vec<String>,
}

impl SweepReport {
    pub fn new(project: impl Into<String>, dry_run: bool) -> Self {
        Self {
            project: project.into(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            skipped_types: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        kind: impl Into<String>,
        location: impl Into<String>,
        id: impl Into<String>,
        outcome: Outcome,
    ) {
        self.entries.push(ResourceEntry {
            kind: kind.into(),
            location: location.into(),
            id: id.into(),
            outcome,
        });
    }

    /// Note a type-level skip. A type skipped for the same reason in many
    /// passes is reported once.
    pub fn record_type_skip(&mut self, kind: impl Into<String>, reason: impl Into<String>) {
        let entry = (kind.into(), reason.into());
        if !self.skipped_types.contains(&entry) {
            self.skipped_types.push(entry);
        }
    }

    /// Note a pass-level failure, e.g. one location's listing call erroring
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn skipped_types(&self) -> &[(String, String)] {
        &self.skipped_types
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn count(&self, matches: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|e| matches(&e.outcome)).count()
    }

    pub fn removed(&self) -> usize {
        self.count(|o| *o == Outcome::Removed)
    }

    pub fn would_remove(&self) -> usize {
        self.count(|o| *o == Outcome::WouldRemove)
    }

    pub fn filtered(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Filtered(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || !self.errors.is_empty()
    }

    fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Sweep of project '{}'{}", self.project, mode)?;

        for entry in &self.entries {
            match &entry.outcome {
                Outcome::Filtered(reason) | Outcome::Failed(reason) => writeln!(
                    f,
                    "  {} {}/{}: {} ({})",
                    entry.kind,
                    entry.location,
                    entry.id,
                    entry.outcome.label(),
                    reason
                )?,
                _ => writeln!(
                    f,
                    "  {} {}/{}: {}",
                    entry.kind,
                    entry.location,
                    entry.id,
                    entry.outcome.label()
                )?,
            }
        }

        if !self.skipped_types.is_empty() {
            writeln!(f, "Skipped resource types:")?;
            for (kind, reason) in &self.skipped_types {
                writeln!(f, "  {}: {}", kind, reason)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  {}", error)?;
            }
        }

        let removal = if self.dry_run {
            format!("{} would be removed", self.would_remove())
        } else {
            format!("{} removed", self.removed())
        };
        write!(
            f,
            "{}, {} filtered, {} failed in {}s",
            removal,
            self.filtered(),
            self.failed() + self.errors.len(),
            self.elapsed().num_seconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_outcome() {
        let mut report = SweepReport::new("p", false);
        report.record("A", "global", "one", Outcome::Removed);
        report.record("A", "global", "two", Outcome::Filtered("kept".into()));
        report.record("B", "us-east1", "three", Outcome::Failed("boom".into()));
        report.finish();

        assert_eq!(report.removed(), 1);
        assert_eq!(report.filtered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.would_remove(), 0);
        assert!(report.has_failures());
    }

    #[test]
    fn pass_errors_count_as_failures() {
        let mut report = SweepReport::new("p", false);
        assert!(!report.has_failures());
        report.record_error("ComputeDisk us-east1-b: listing failed");
        assert!(report.has_failures());
        assert!(report.to_string().contains("listing failed"));
    }

    #[test]
    fn repeated_type_skips_collapse() {
        let mut report = SweepReport::new("p", true);
        report.record_type_skip("SQLInstance", "API sqladmin.googleapis.com is not enabled");
        report.record_type_skip("SQLInstance", "API sqladmin.googleapis.com is not enabled");
        report.record_type_skip("SQLInstance", "different reason");

        assert_eq!(report.skipped_types().len(), 2);
    }

    #[test]
    fn display_carries_reasons_and_summary() {
        let mut report = SweepReport::new("acme-sandbox", true);
        report.record("ComputeDisk", "us-east1-b", "scratch", Outcome::WouldRemove);
        report.record(
            "IAMServiceAccount",
            "global",
            "builder@acme.iam",
            Outcome::Filtered("default service account".into()),
        );
        report.finish();

        let text = report.to_string();
        assert!(text.contains("acme-sandbox"));
        assert!(text.contains("(dry run)"));
        assert!(text.contains("ComputeDisk us-east1-b/scratch: would remove"));
        assert!(text.contains("filtered (default service account)"));
        assert!(text.contains("1 would be removed, 1 filtered, 0 failed"));
    }
}
