//! Adapter interfaces for the remote service.
//!
//! Each remote concern sits behind its own trait so the orchestration core
//! can be driven by the HTTP backend in production and by in-memory fakes
//! in tests. Implementations return typed wire values; deciding what a
//! status or reply *means* is left to the core.

pub mod http;

use async_trait::async_trait;

use crate::domain::{JobId, JobPayload, LiveStateReport, TurnInput, TurnReply};
use crate::error::Result;

// Re-export the HTTP backend
pub use http::HttpBackend;

/// Response to a job submission
#[derive(Debug, Clone)]
pub struct JobAccepted {
    pub job_id: JobId,
    /// Initial status string as reported by the remote
    pub status: String,
}

/// One answer from the job status endpoint
#[derive(Debug, Clone)]
pub struct JobStatusReport {
    /// Raw status string (`submitted`, `running`, `done`, `failed`, ...)
    pub status: String,
    pub artifact_ref: Option<String>,
}

impl JobStatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            artifact_ref: None,
        }
    }

    pub fn with_artifact(mut self, artifact_ref: impl Into<String>) -> Self {
        self.artifact_ref = Some(artifact_ref.into());
        self
    }
}

/// Text-to-speech request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
    /// Identity of the speaking artifact, if any
    pub speaker_id: Option<String>,
}

/// Text-to-speech response
#[derive(Debug, Clone)]
pub struct SpeechReply {
    /// URL/handle of the synthesized audio (may be empty on a bad reply)
    pub audio_ref: Option<String>,
}

/// Long-running generation jobs
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit a job; the remote assigns its id
    async fn submit_job(&self, payload: &JobPayload) -> Result<JobAccepted>;

    /// Fetch the current status of a job
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport>;
}

/// Conversational AI endpoint
#[async_trait]
pub trait TurnBackend: Send + Sync {
    async fn post_turn(&self, input: &TurnInput) -> Result<TurnReply>;
}

/// Speech synthesis endpoint
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechReply>;
}

/// Ambient live-state endpoint and its health companion
#[async_trait]
pub trait LiveStateBackend: Send + Sync {
    async fn live_state(&self) -> Result<LiveStateReport>;

    /// Succeeds when the companion health endpoint answers 2xx
    async fn health(&self) -> Result<()>;
}
