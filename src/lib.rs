//! vpilot - Remote orchestration core for a spatial assistant
//!
//! A client-side runtime that drives remote AI and generation services
//! and turns their answers into scene effects.
//!
//! # Architecture
//!
//! Four cooperating components, each running its work as tokio tasks and
//! talking to the remote through adapter traits:
//! - Job poller: submit long-running generation jobs, poll to a terminal result
//! - Turn dispatcher: one request, one structured reply, effects applied downstream
//! - Live synchronizer: poll ambient state, forward only what changed
//! - Capture pipeline: record, trim, encode and hand off audio or images
//!
//! # Modules
//!
//! - `adapters`: Remote service traits and the HTTP backend
//! - `core`: The components above and the session that wires them
//! - `domain`: Data structures (Job, TurnResult, LiveState, captures)
//! - `presentation`: Downstream collaborators (display, audio, placement)
//! - `config`: Settings discovery and defaults
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Generate an artifact from a photo
//! vpilot generate --image lamp.jpg
//!
//! # Ask about a segment
//! vpilot ask --segment plant_01 --label plant
//!
//! # Watch live state for 30 seconds
//! vpilot watch --duration 30
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod presentation;

// Re-export main types at crate root for convenience
pub use config::Settings;
pub use crate::core::{CapturePipeline, JobPoller, LiveSynchronizer, Session, TurnDispatcher};
pub use domain::{LiveState, TerminalResult, TurnInput, TurnResult};
pub use error::{OrchestratorError, Result};
pub use presentation::Presentation;
