//! Generation jobs tracked to a terminal outcome.
//!
//! A Job is owned by the poller that submitted it and is dropped once its
//! terminal result has been handed back to the caller.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Opaque, server-assigned job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a job as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Running,
    Done,
    Failed,
    /// Client-side only; the remote never reports this
    TimedOut,
}

impl JobStatus {
    /// Parse a status string reported by the remote.
    ///
    /// Returns `None` for anything outside the wire vocabulary, including
    /// `timed_out`, which only the client assigns.
    pub fn parse_remote(status: &str) -> Option<Self> {
        match status {
            "submitted" => Some(Self::Submitted),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Input to a generation job
#[derive(Debug, Clone)]
pub enum JobPayload {
    /// Encoded image (JPEG) to reconstruct into a 3D artifact
    Image { jpeg: Vec<u8>, name: String },

    /// Free-text prompt
    Prompt { text: String, name: String },
}

impl JobPayload {
    pub fn name(&self) -> &str {
        match self {
            Self::Image { name, .. } | Self::Prompt { name, .. } => name,
        }
    }

    /// Size of the payload body in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Image { jpeg, .. } => jpeg.len(),
            Self::Prompt { text, .. } => text.len(),
        }
    }
}

/// A submitted job and its deadline
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Artifact URL/handle, present once the job is done
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    started: Instant,
    deadline: Instant,
}

impl Job {
    /// Start tracking a job from now with the given timeout
    pub fn new(id: JobId, status: JobStatus, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            id,
            status,
            artifact_ref: None,
            created_at: Utc::now(),
            started,
            deadline: started + timeout,
        }
    }

    /// Recompute the deadline from the original start time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = self.started + timeout;
        self
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Outcome that ends waiting on a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalResult {
    Success { artifact_ref: String },
    Failure { reason: String },
    TimedOut,
}

impl TerminalResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Status line shown when this outcome is reached
    pub fn status_text(&self) -> String {
        match self {
            Self::Success { .. } => "Artifact ready".to_string(),
            Self::Failure { reason } => format!("Generation failed: {}", reason),
            Self::TimedOut => "Generation timed out. Try again.".to_string(),
        }
    }
}

impl fmt::Display for TerminalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { artifact_ref } => write!(f, "success ({})", artifact_ref),
            Self::Failure { reason } => write!(f, "failure ({})", reason),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_status() {
        assert_eq!(JobStatus::parse_remote("running"), Some(JobStatus::Running));
        assert_eq!(JobStatus::parse_remote("done"), Some(JobStatus::Done));
        assert_eq!(JobStatus::parse_remote("DONE"), None);
        assert_eq!(JobStatus::parse_remote("timed_out"), None);
        assert_eq!(JobStatus::parse_remote("queued"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_deadline() {
        let job = Job::new(JobId::new("7"), JobStatus::Submitted, Duration::from_secs(2));
        assert!(!job.is_expired());
        assert_eq!(job.remaining(), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(job.is_expired());
        assert_eq!(job.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_terminal_status_text_distinct() {
        let ok = TerminalResult::Success {
            artifact_ref: "u".into(),
        };
        let failed = TerminalResult::failure("missing artifact");
        assert_ne!(ok.status_text(), failed.status_text());
        assert_ne!(failed.status_text(), TerminalResult::TimedOut.status_text());
    }
}
