//! Conversational turn dispatch.
//!
//! A turn posts one input to the AI endpoint, parses the structured reply,
//! and applies its effects downstream. The whole remote exchange is
//! finished and validated before any effect fires, so a failed turn leaves
//! the scene untouched.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{SpeechBackend, SpeechRequest, TurnBackend};
use crate::config::TurnSettings;
use crate::domain::{SpeechOutcome, TurnInput, TurnReply, TurnResult};
use crate::error::{OrchestratorError, Result};
use crate::presentation::{AudioClip, Placement, Presentation, StatusChannel};

/// Reply audio decoded ahead of applying effects
enum InlineVoice {
    None,
    Clip(Vec<u8>),
    Invalid(String),
}

impl InlineVoice {
    fn decode(reply: &TurnReply) -> Self {
        match reply.voice_b64.as_deref().map(str::trim) {
            None | Some("") => Self::None,
            Some(encoded) => match BASE64.decode(encoded) {
                Ok(bytes) if !bytes.is_empty() => Self::Clip(bytes),
                Ok(_) => Self::Invalid("inline voice is empty".to_string()),
                Err(e) => Self::Invalid(format!("inline voice is not base64: {}", e)),
            },
        }
    }
}

/// Sends turns and applies the reply's effects
#[derive(Clone)]
pub struct TurnDispatcher {
    turns: Arc<dyn TurnBackend>,
    speech: Arc<dyn SpeechBackend>,
    presentation: Presentation,
    settings: TurnSettings,
}

impl TurnDispatcher {
    pub fn new(
        turns: Arc<dyn TurnBackend>,
        speech: Arc<dyn SpeechBackend>,
        presentation: Presentation,
        settings: TurnSettings,
    ) -> Self {
        Self {
            turns,
            speech,
            presentation,
            settings,
        }
    }

    /// Run [`dispatch`](Self::dispatch) as a background task.
    ///
    /// Each call is independent; concurrent turns are allowed.
    pub fn spawn(&self, input: TurnInput) -> JoinHandle<Result<TurnResult>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(input).await })
    }

    /// Send one turn and apply its effects.
    ///
    /// Errors ([`OrchestratorError::Timeout`], `Transport`, `Protocol`) are
    /// returned before any effect is applied. Speech failures never fail the
    /// turn; they are reported through [`TurnResult::speech`].
    #[instrument(skip(self, input), fields(kind = input.kind(), object = input.target.as_deref()))]
    pub async fn dispatch(&self, input: TurnInput) -> Result<TurnResult> {
        let deadline = self.settings.timeout();
        self.set_status("Thinking...");

        let reply = match timeout(deadline, self.turns.post_turn(&input)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "Turn failed");
                self.set_status(&e.status_text());
                return Err(e);
            }
            Err(_) => {
                let err = OrchestratorError::Timeout(deadline);
                warn!(timeout_ms = deadline.as_millis() as u64, "Turn timed out");
                self.set_status(&err.status_text());
                return Err(err);
            }
        };

        let voice = InlineVoice::decode(&reply);
        let mut result = TurnResult::from_reply(reply);

        info!(
            intent = result.intent.as_deref().unwrap_or("-"),
            effects = ?result.effects.active().collect::<Vec<_>>(),
            "Turn reply received"
        );
        if let Some(heard) = &result.user_text {
            debug!(%heard, "Transcribed input");
        }

        self.apply_visual_effects(&result, &input);
        result.speech = self.apply_speech(&result, &input, voice).await;

        Ok(result)
    }

    /// Show `text` and speak it, outside any turn.
    ///
    /// Used for canned replies such as greetings. Speech failures degrade
    /// to text only.
    pub async fn speak_reply(&self, text: &str, emotion: Option<&str>) -> SpeechOutcome {
        self.presentation.messages.show_message(text, emotion);
        self.synthesize(text, None, None).await
    }

    fn apply_visual_effects(&self, result: &TurnResult, input: &TurnInput) {
        let anchor = result.segment_id.as_deref().or(input.target.as_deref());

        if !result.message.is_empty() {
            self.presentation
                .messages
                .show_message(&result.message, result.emotion.as_deref());
        }

        if result.effects.highlight() {
            self.presentation.highlight.highlight(anchor);
        }

        if result.effects.hologram() {
            self.presentation.placement.place_artifact(&Placement {
                artifact_ref: result.artifact_ref.clone(),
                anchor: anchor.map(str::to_string),
                name: None,
            });
        }
    }

    async fn apply_speech(
        &self,
        result: &TurnResult,
        input: &TurnInput,
        voice: InlineVoice,
    ) -> SpeechOutcome {
        match voice {
            InlineVoice::Clip(bytes) => {
                self.presentation.audio.play(&AudioClip::Inline(bytes));
                return SpeechOutcome::Played;
            }
            InlineVoice::Invalid(reason) => {
                warn!(%reason, "Speech degraded to text");
                return SpeechOutcome::Degraded { reason };
            }
            InlineVoice::None => {}
        }

        let wants_speech = result.effects.speak() || self.settings.speak_every_reply;
        if !wants_speech || result.message.is_empty() {
            return SpeechOutcome::NotRequested;
        }

        self.synthesize(
            &result.message,
            input.voice_id.as_deref(),
            input.speaker_id.as_deref(),
        )
        .await
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        speaker_id: Option<&str>,
    ) -> SpeechOutcome {
        let request = SpeechRequest {
            text: text.to_string(),
            voice_id: voice_id
                .map(str::to_string)
                .or_else(|| self.settings.default_voice_id.clone()),
            speaker_id: speaker_id.map(str::to_string),
        };

        let deadline = self.settings.speech_timeout();
        let reason = match timeout(deadline, self.speech.synthesize(&request)).await {
            Ok(Ok(reply)) => match reply.audio_ref.filter(|r| !r.trim().is_empty()) {
                Some(audio_ref) => {
                    self.presentation.audio.play(&AudioClip::Url(audio_ref));
                    return SpeechOutcome::Played;
                }
                None => "speech reply had no audio".to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => OrchestratorError::Timeout(deadline).to_string(),
        };

        warn!(%reason, "Speech degraded to text");
        SpeechOutcome::Degraded { reason }
    }

    fn set_status(&self, text: &str) {
        self.presentation.status.set_status(StatusChannel::Turn, text);
    }
}
