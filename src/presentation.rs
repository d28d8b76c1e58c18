//! Downstream presentation collaborators.
//!
//! The core calls into these fire-and-forget: no return value is consumed
//! and implementations must not block (hand work to the render loop
//! instead). Components receive them at construction through
//! [`Presentation`].

use std::sync::Arc;

use tracing::info;

use crate::domain::SegmentChange;

/// Where a status line belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChannel {
    Capture,
    Job,
    Turn,
    Live,
}

/// Audio handed to the playback collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioClip {
    /// Remote clip to download and play
    Url(String),
    /// Already-decoded file bytes (e.g. inline voice)
    Inline(Vec<u8>),
}

/// Request to place a 3D artifact in the scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// URL/handle of the produced model, if the remote supplied one
    pub artifact_ref: Option<String>,
    /// Segment or object to anchor on; `None` places in front of the viewer
    pub anchor: Option<String>,
    pub name: Option<String>,
}

pub trait MessageDisplay: Send + Sync {
    fn show_message(&self, message: &str, emotion: Option<&str>);
}

pub trait HighlightTrigger: Send + Sync {
    fn highlight(&self, target: Option<&str>);
}

pub trait ArtifactPlacement: Send + Sync {
    fn place_artifact(&self, placement: &Placement);
}

pub trait AudioPlayback: Send + Sync {
    fn play(&self, clip: &AudioClip);
}

pub trait SegmentActivation: Send + Sync {
    fn activate_segment(&self, change: &SegmentChange);
}

pub trait SelectionUpdate: Send + Sync {
    fn select_at(&self, x: f32, y: f32);
}

/// Advisory status text; its absence never affects correctness
pub trait StatusSink: Send + Sync {
    fn set_status(&self, channel: StatusChannel, text: &str);
}

/// Every collaborator a session needs, injected as shared handles
#[derive(Clone)]
pub struct Presentation {
    pub messages: Arc<dyn MessageDisplay>,
    pub highlight: Arc<dyn HighlightTrigger>,
    pub placement: Arc<dyn ArtifactPlacement>,
    pub audio: Arc<dyn AudioPlayback>,
    pub segments: Arc<dyn SegmentActivation>,
    pub selection: Arc<dyn SelectionUpdate>,
    pub status: Arc<dyn StatusSink>,
}

impl Presentation {
    /// Use one object for every collaborator role
    pub fn shared<T>(all: Arc<T>) -> Self
    where
        T: MessageDisplay
            + HighlightTrigger
            + ArtifactPlacement
            + AudioPlayback
            + SegmentActivation
            + SelectionUpdate
            + StatusSink
            + 'static,
    {
        Self {
            messages: all.clone(),
            highlight: all.clone(),
            placement: all.clone(),
            audio: all.clone(),
            segments: all.clone(),
            selection: all.clone(),
            status: all,
        }
    }

    /// Collaborators that only log (headless / CLI use)
    pub fn logging() -> Self {
        Self::shared(Arc::new(TracingPresentation))
    }
}

/// Logs every downstream call through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresentation;

impl MessageDisplay for TracingPresentation {
    fn show_message(&self, message: &str, emotion: Option<&str>) {
        info!(emotion = emotion.unwrap_or("-"), "Message: {}", message);
    }
}

impl HighlightTrigger for TracingPresentation {
    fn highlight(&self, target: Option<&str>) {
        info!(object = target.unwrap_or("current"), "Highlight");
    }
}

impl ArtifactPlacement for TracingPresentation {
    fn place_artifact(&self, placement: &Placement) {
        info!(
            artifact = placement.artifact_ref.as_deref().unwrap_or("blueprint"),
            anchor = placement.anchor.as_deref().unwrap_or("viewer"),
            name = placement.name.as_deref().unwrap_or("-"),
            "Place artifact"
        );
    }
}

impl AudioPlayback for TracingPresentation {
    fn play(&self, clip: &AudioClip) {
        match clip {
            AudioClip::Url(url) => info!(%url, "Play audio"),
            AudioClip::Inline(bytes) => info!(bytes = bytes.len(), "Play inline audio"),
        }
    }
}

impl SegmentActivation for TracingPresentation {
    fn activate_segment(&self, change: &SegmentChange) {
        info!(
            segment = change.segment_id.as_deref().unwrap_or("-"),
            previous = change.previous.as_deref().unwrap_or("-"),
            policy = ?change.policy,
            "Activate segment"
        );
    }
}

impl SelectionUpdate for TracingPresentation {
    fn select_at(&self, x: f32, y: f32) {
        info!("Select at x={:.3}, y={:.3}", x, y);
    }
}

impl StatusSink for TracingPresentation {
    fn set_status(&self, channel: StatusChannel, text: &str) {
        tracing::debug!(?channel, "{}", text);
    }
}
