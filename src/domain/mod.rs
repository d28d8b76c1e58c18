//! Domain types for the orchestration core.
//!
//! This module contains the core data structures:
//! - Job: generation jobs and their terminal outcomes
//! - Turn: conversational request/reply exchanges
//! - LiveState: ambient pointer/segment snapshots
//! - Capture: capture states and payloads

pub mod capture;
pub mod job;
pub mod live;
pub mod turn;

// Re-export commonly used types
pub use capture::{AudioPayload, CaptureFormat, CapturePayload, CaptureState};
pub use job::{Job, JobId, JobPayload, JobStatus, TerminalResult};
pub use live::{LiveDiff, LiveState, LiveStateReport, SegmentChange, SegmentSwitchPolicy};
pub use turn::{EffectFlags, SpeechOutcome, TurnInput, TurnPayload, TurnReply, TurnResult};
