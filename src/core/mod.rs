//! Core orchestration logic.
//!
//! This module contains:
//! - JobPoller: Job submission and completion polling
//! - TurnDispatcher: Conversational turns and their effects
//! - LiveSynchronizer: Ambient state polling and change propagation
//! - CapturePipeline: Recording, encoding and hand-off
//! - Session: Wiring of all of the above

pub mod capture;
pub mod job_poller;
pub mod live_sync;
pub mod session;
pub mod throttle;
pub mod turn_dispatcher;

// Re-export commonly used types
pub use capture::{
    encode_wav, CaptureDevice, CapturePipeline, FrameSource, NoDevice, PayloadSink, StopOutcome,
};
pub use job_poller::{JobHandle, JobPoller, PollPolicy, MISSING_ARTIFACT};
pub use live_sync::{LiveStats, LiveSyncHandle, LiveSynchronizer, PollOutcome};
pub use session::{Backends, Session, SessionSink};
pub use throttle::LogThrottle;
pub use turn_dispatcher::TurnDispatcher;
