//! Session wiring: one place that builds every component from settings.
//!
//! Components never reach for global state; a [`Session`] hands each of
//! them its backends, presentation handles and settings at construction.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{HttpBackend, JobBackend, LiveStateBackend, SpeechBackend, TurnBackend};
use crate::config::Settings;
use crate::core::capture::{CaptureDevice, CapturePipeline, PayloadSink};
use crate::core::job_poller::{JobPoller, PollPolicy};
use crate::core::live_sync::LiveSynchronizer;
use crate::core::turn_dispatcher::TurnDispatcher;
use crate::domain::{CapturePayload, JobPayload, TurnInput};
use crate::error::Result;
use crate::presentation::Presentation;

/// Remote services used by a session
#[derive(Clone)]
pub struct Backends {
    pub jobs: Arc<dyn JobBackend>,
    pub turns: Arc<dyn TurnBackend>,
    pub speech: Arc<dyn SpeechBackend>,
    pub live: Arc<dyn LiveStateBackend>,
}

impl Backends {
    /// Route every concern through one HTTP client
    pub fn http(settings: &Settings) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(settings)?);
        Ok(Self {
            jobs: backend.clone(),
            turns: backend.clone(),
            speech: backend.clone(),
            live: backend,
        })
    }
}

/// Shared entry point for the orchestration components
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    settings: Settings,
    presentation: Presentation,
    backends: Backends,
    jobs: JobPoller,
    turns: TurnDispatcher,
    runtime: Option<Handle>,
}

impl Session {
    /// Build a session talking HTTP to `settings.base_url`
    pub fn new(settings: Settings, presentation: Presentation) -> Result<Self> {
        let backends = Backends::http(&settings)?;
        Ok(Self::with_backends(settings, presentation, backends))
    }

    /// Build a session with explicit backends (used by tests).
    ///
    /// The runtime entered at construction, if any, runs the work handed
    /// off by [`SessionSink`]; see [`with_runtime`](Self::with_runtime).
    pub fn with_backends(settings: Settings, presentation: Presentation, backends: Backends) -> Self {
        let id = Uuid::new_v4();
        let runtime = Handle::try_current().ok();

        let jobs = JobPoller::new(
            backends.jobs.clone(),
            &presentation,
            PollPolicy::from(&settings.jobs),
        );
        let turns = TurnDispatcher::new(
            backends.turns.clone(),
            backends.speech.clone(),
            presentation.clone(),
            settings.turns.clone(),
        );

        info!(
            session_id = %id,
            base_url = %settings.base_url,
            runtime = runtime.is_some(),
            "Session created"
        );

        Self {
            id,
            settings,
            presentation,
            backends,
            jobs,
            turns,
            runtime,
        }
    }

    /// Run handed-off turns and jobs on `runtime`
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn jobs(&self) -> &JobPoller {
        &self.jobs
    }

    pub fn turns(&self) -> &TurnDispatcher {
        &self.turns
    }

    /// A fresh synchronizer; call `start` on it to begin polling
    pub fn live_sync(&self) -> LiveSynchronizer {
        LiveSynchronizer::new(
            self.backends.live.clone(),
            &self.presentation,
            self.settings.live.clone(),
            self.settings.request_timeout(),
        )
    }

    /// A capture pipeline that routes recordings into this session
    pub fn capture_pipeline(&self, device: Box<dyn CaptureDevice>) -> CapturePipeline {
        CapturePipeline::new(
            device,
            Arc::new(self.payload_sink()),
            self.presentation.status.clone(),
            self.settings.capture.clone(),
        )
    }

    pub fn payload_sink(&self) -> SessionSink {
        SessionSink {
            jobs: self.jobs.clone(),
            turns: self.turns.clone(),
            artifact_name: self.settings.jobs.artifact_name.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

/// Routes finished captures: audio becomes a turn, images become a job.
///
/// Safe to call from threads outside the runtime (e.g. a UI loop); the
/// work is spawned on the session's runtime.
#[derive(Clone)]
pub struct SessionSink {
    jobs: JobPoller,
    turns: TurnDispatcher,
    artifact_name: String,
    runtime: Option<Handle>,
}

impl PayloadSink for SessionSink {
    fn submit(&self, payload: CapturePayload) {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("No async runtime; dropping captured payload");
            return;
        };
        let _entered = runtime.enter();

        match payload {
            CapturePayload::Audio(audio) => {
                debug!(frames = audio.frames, "Dispatching voice turn");
                self.turns.spawn(TurnInput::audio(audio.wav));
            }
            CapturePayload::Image { jpeg } => {
                debug!(bytes = jpeg.len(), "Submitting image job");
                self.jobs.spawn_generate(JobPayload::Image {
                    jpeg,
                    name: self.artifact_name.clone(),
                });
            }
        }
    }
}
