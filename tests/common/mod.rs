//! Shared fakes for integration tests.
//!
//! `Recorder` stands in for every presentation collaborator and keeps an
//! ordered log of calls; the scripted backends answer from queues.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vpilot::adapters::{
    JobAccepted, JobBackend, JobStatusReport, LiveStateBackend, SpeechBackend, SpeechReply,
    SpeechRequest, TurnBackend,
};
use vpilot::domain::{JobId, JobPayload, LiveStateReport, SegmentChange, TurnInput, TurnReply};
use vpilot::presentation::{
    ArtifactPlacement, AudioClip, AudioPlayback, HighlightTrigger, MessageDisplay, Placement,
    Presentation, SegmentActivation, SelectionUpdate, StatusChannel, StatusSink,
};
use vpilot::{OrchestratorError, Result};

/// One downstream call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(String, Option<String>),
    Highlight(Option<String>),
    Place(Placement),
    Play(AudioClip),
    Segment(SegmentChange),
    Select(f32, f32),
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    statuses: Mutex<Vec<(StatusChannel, String)>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self, channel: StatusChannel) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last_status(&self, channel: StatusChannel) -> Option<String> {
        self.statuses(channel).pop()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl MessageDisplay for Recorder {
    fn show_message(&self, message: &str, emotion: Option<&str>) {
        self.push(Event::Message(
            message.to_string(),
            emotion.map(str::to_string),
        ));
    }
}

impl HighlightTrigger for Recorder {
    fn highlight(&self, target: Option<&str>) {
        self.push(Event::Highlight(target.map(str::to_string)));
    }
}

impl ArtifactPlacement for Recorder {
    fn place_artifact(&self, placement: &Placement) {
        self.push(Event::Place(placement.clone()));
    }
}

impl AudioPlayback for Recorder {
    fn play(&self, clip: &AudioClip) {
        self.push(Event::Play(clip.clone()));
    }
}

impl SegmentActivation for Recorder {
    fn activate_segment(&self, change: &SegmentChange) {
        self.push(Event::Segment(change.clone()));
    }
}

impl SelectionUpdate for Recorder {
    fn select_at(&self, x: f32, y: f32) {
        self.push(Event::Select(x, y));
    }
}

impl StatusSink for Recorder {
    fn set_status(&self, channel: StatusChannel, text: &str) {
        self.statuses
            .lock()
            .unwrap()
            .push((channel, text.to_string()));
    }
}

pub fn presentation(recorder: &Arc<Recorder>) -> Presentation {
    Presentation::shared(recorder.clone())
}

/// Job backend answering status polls from a script.
///
/// When the script runs dry the last answer repeats.
pub struct ScriptedJobs {
    pub accept: Mutex<Option<Result<JobAccepted>>>,
    pub statuses: Mutex<VecDeque<Result<JobStatusReport>>>,
    pub last: Mutex<Option<Result<JobStatusReport>>>,
    pub status_delay: Duration,
    pub polls: Mutex<u32>,
}

impl ScriptedJobs {
    pub fn new(statuses: Vec<Result<JobStatusReport>>) -> Self {
        Self {
            accept: Mutex::new(Some(Ok(JobAccepted {
                job_id: JobId::new("42"),
                status: "submitted".to_string(),
            }))),
            statuses: Mutex::new(statuses.into()),
            last: Mutex::new(None),
            status_delay: Duration::ZERO,
            polls: Mutex::new(0),
        }
    }

    pub fn rejecting(err: OrchestratorError) -> Self {
        let jobs = Self::new(Vec::new());
        *jobs.accept.lock().unwrap() = Some(Err(err));
        jobs
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl JobBackend for ScriptedJobs {
    async fn submit_job(&self, _payload: &JobPayload) -> Result<JobAccepted> {
        self.accept
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(OrchestratorError::Transport("no script".into())))
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatusReport> {
        *self.polls.lock().unwrap() += 1;
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(answer) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(JobStatusReport::new("running"))),
        }
    }
}

/// Turn backend returning one canned reply after an optional delay
pub struct ScriptedTurns {
    pub reply: Result<TurnReply>,
    pub delay: Duration,
    pub seen: Mutex<Vec<TurnInput>>,
}

impl ScriptedTurns {
    pub fn new(reply: Result<TurnReply>) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn json(json: &str) -> Self {
        Self::new(Ok(serde_json::from_str(json).unwrap()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TurnBackend for ScriptedTurns {
    async fn post_turn(&self, input: &TurnInput) -> Result<TurnReply> {
        self.seen.lock().unwrap().push(input.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone()
    }
}

/// Speech backend with a fixed answer
pub struct ScriptedSpeech {
    pub reply: Result<SpeechReply>,
    pub requests: Mutex<Vec<SpeechRequest>>,
}

impl ScriptedSpeech {
    pub fn ok(audio_ref: &str) -> Self {
        Self {
            reply: Ok(SpeechReply {
                audio_ref: Some(audio_ref.to_string()),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: OrchestratorError) -> Self {
        Self {
            reply: Err(err),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechBackend for ScriptedSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

/// Live backend answering from a script, repeating the last answer
pub struct ScriptedLive {
    pub healthy: bool,
    pub states: Mutex<VecDeque<Result<LiveStateReport>>>,
    pub last: Mutex<Option<Result<LiveStateReport>>>,
    pub polls: Mutex<u32>,
    pub delay: Duration,
}

impl ScriptedLive {
    pub fn new(states: Vec<Result<LiveStateReport>>) -> Self {
        Self {
            healthy: true,
            states: Mutex::new(states.into()),
            last: Mutex::new(None),
            polls: Mutex::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Answer each poll only after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl LiveStateBackend for ScriptedLive {
    async fn live_state(&self) -> Result<LiveStateReport> {
        *self.polls.lock().unwrap() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.states.lock().unwrap().pop_front();
        match next {
            Some(answer) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(OrchestratorError::Transport("no script".into()))),
        }
    }

    async fn health(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(OrchestratorError::Transport("HTTP 503".into()))
        }
    }
}

pub fn report(x: f32, y: f32, segment: Option<&str>) -> Result<LiveStateReport> {
    Ok(LiveStateReport {
        x,
        y,
        segment_id: segment.map(str::to_string),
        source: None,
    })
}
