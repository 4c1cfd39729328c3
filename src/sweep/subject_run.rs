//! Subject Run - lifecycle of one subject inside a sweep

use crate::data::SubjectId;
use crate::runner::ExecutionSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of a subject run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubjectStatus {
    /// Not started yet.
    Pending,
    /// Loading, encoding or running the catalog.
    Running,
    /// Every split ran; individual models may still have failed.
    Completed,
    /// Aborted before or during the catalog loop.
    Failed,
}

/// One subject's pass through the sweep.
///
/// Kept in memory and logged; never written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRun {
    subject: SubjectId,
    status: SubjectStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    summary: Option<ExecutionSummary>,
    error: Option<String>,
}

impl SubjectRun {
    /// Create a run in Pending status.
    #[must_use]
    pub const fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            status: SubjectStatus::Pending,
            started_at: None,
            ended_at: None,
            summary: None,
            error: None,
        }
    }

    /// Get the subject.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> SubjectStatus {
        self.status
    }

    /// Get the start timestamp, if started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if finished.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Execution summary of a completed run.
    #[must_use]
    pub const fn summary(&self) -> Option<&ExecutionSummary> {
        self.summary.as_ref()
    }

    /// Failure reason of a failed run.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Transition Pending to Running and stamp `started_at`.
    pub fn start(&mut self) {
        self.status = SubjectStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Finish with the catalog loop's summary.
    pub fn complete(&mut self, summary: ExecutionSummary) {
        self.status = SubjectStatus::Completed;
        self.summary = Some(summary);
        self.ended_at = Some(Utc::now());
    }

    /// Finish with a failure reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = SubjectStatus::Failed;
        self.error = Some(reason.into());
        self.ended_at = Some(Utc::now());
    }
}
