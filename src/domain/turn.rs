//! Conversational turns: one request, one structured reply.
//!
//! Turns are stateless; nothing here refers to a previous exchange.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the user sent
#[derive(Debug, Clone)]
pub enum TurnPayload {
    /// Typed or transcribed text
    Text(String),

    /// Encoded WAV recording
    Audio { wav: Vec<u8> },

    /// Context for a selected segment group
    Segment { segment_id: String, label: String },
}

/// One unit of user intent
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub payload: TurnPayload,

    /// Segment or object the turn is about (used to anchor effects)
    pub target: Option<String>,

    /// Voice for the spoken reply, overriding the configured default
    pub voice_id: Option<String>,

    /// Artifact that speaks the reply, forwarded to speech synthesis
    pub speaker_id: Option<String>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: TurnPayload::Text(text.into()),
            target: None,
            voice_id: None,
            speaker_id: None,
        }
    }

    pub fn audio(wav: Vec<u8>) -> Self {
        Self {
            payload: TurnPayload::Audio { wav },
            target: None,
            voice_id: None,
            speaker_id: None,
        }
    }

    pub fn segment(segment_id: impl Into<String>, label: impl Into<String>) -> Self {
        let segment_id = segment_id.into();
        Self {
            target: Some(segment_id.clone()),
            payload: TurnPayload::Segment {
                segment_id,
                label: label.into(),
            },
            voice_id: None,
            speaker_id: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_speaker(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            TurnPayload::Text(_) => "text",
            TurnPayload::Audio { .. } => "audio",
            TurnPayload::Segment { .. } => "segment",
        }
    }
}

/// Raw reply from the AI endpoint.
///
/// Accepts both the segment reply shape (`message`, `emotion`) and the voice
/// command shape (`ai_text`, `action`). Effect values must be booleans; any
/// other type fails the whole parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnReply {
    #[serde(default, alias = "ai_text")]
    pub message: Option<String>,

    #[serde(default)]
    pub emotion: Option<String>,

    #[serde(default)]
    pub intent: Option<String>,

    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub effects: Option<BTreeMap<String, bool>>,

    #[serde(default, alias = "artifact_ref")]
    pub model_url: Option<String>,

    #[serde(default)]
    pub segment_group_id: Option<String>,

    /// Transcription of an audio turn
    #[serde(default)]
    pub user_text: Option<String>,

    /// Inline spoken reply (base64 audio)
    #[serde(default)]
    pub voice_b64: Option<String>,
}

/// Named boolean effect flags from a reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectFlags(BTreeMap<String, bool>);

impl EffectFlags {
    pub const HIGHLIGHT: &'static str = "highlight";
    pub const HOLOGRAM: &'static str = "hologram";
    pub const SPEAK: &'static str = "speak";

    pub fn new(flags: BTreeMap<String, bool>) -> Self {
        Self(flags)
    }

    /// True only when the flag is present and set; absent means "do nothing"
    pub fn is_set(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn highlight(&self) -> bool {
        self.is_set(Self::HIGHLIGHT)
    }

    pub fn hologram(&self) -> bool {
        self.is_set(Self::HOLOGRAM)
    }

    pub fn speak(&self) -> bool {
        self.is_set(Self::SPEAK)
    }

    /// Names of all set flags
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
    }
}

impl<const N: usize> From<[(&str, bool); N]> for EffectFlags {
    fn from(pairs: [(&str, bool); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(name, on)| (name.to_string(), on))
                .collect(),
        )
    }
}

/// What happened to the spoken reply of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    NotRequested,
    Played,
    /// Speech failed; the turn fell back to text only
    Degraded { reason: String },
}

/// Normalized result of a successful turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub message: String,
    /// Emotion or intent tag passed along with the message
    pub emotion: Option<String>,
    pub intent: Option<String>,
    pub effects: EffectFlags,
    pub artifact_ref: Option<String>,
    /// Segment the reply refers to, if the remote named one
    pub segment_id: Option<String>,
    pub user_text: Option<String>,
    pub speech: SpeechOutcome,
}

impl TurnResult {
    /// Build from a parsed reply. Empty strings are treated as absent.
    pub fn from_reply(reply: TurnReply) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        let intent = non_empty(reply.intent);
        let emotion = non_empty(reply.emotion).or_else(|| non_empty(reply.action));

        Self {
            message: reply.message.unwrap_or_default(),
            emotion,
            intent,
            effects: EffectFlags::new(reply.effects.unwrap_or_default()),
            artifact_ref: non_empty(reply.model_url),
            segment_id: non_empty(reply.segment_group_id),
            user_text: non_empty(reply.user_text),
            speech: SpeechOutcome::NotRequested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_reply_shape() {
        let json = r#"{
            "segment_group_id": "plant_01",
            "intent": "explain",
            "action": "none",
            "message": "This is a peace lily.",
            "emotion": "happy",
            "effects": {"highlight": true, "hologram": false},
            "model_url": null
        }"#;

        let result = TurnResult::from_reply(serde_json::from_str(json).unwrap());
        assert_eq!(result.message, "This is a peace lily.");
        assert_eq!(result.emotion.as_deref(), Some("happy"));
        assert!(result.effects.highlight());
        assert!(!result.effects.hologram());
        assert_eq!(result.artifact_ref, None);
        assert_eq!(result.segment_id.as_deref(), Some("plant_01"));
    }

    #[test]
    fn test_voice_reply_shape() {
        let json = r#"{
            "user_text": "what is this",
            "ai_text": "A lamp.",
            "action": "curious",
            "effects": {"hologram": true},
            "model_url": "https://cdn/lamp.glb"
        }"#;

        let result = TurnResult::from_reply(serde_json::from_str(json).unwrap());
        assert_eq!(result.message, "A lamp.");
        assert_eq!(result.emotion.as_deref(), Some("curious"));
        assert_eq!(result.user_text.as_deref(), Some("what is this"));
        assert!(result.effects.hologram());
        assert!(!result.effects.highlight());
        assert_eq!(result.artifact_ref.as_deref(), Some("https://cdn/lamp.glb"));
    }

    #[test]
    fn test_non_boolean_effect_rejected() {
        let json = r#"{"message": "hi", "effects": {"highlight": "yes"}}"#;
        assert!(serde_json::from_str::<TurnReply>(json).is_err());
    }

    #[test]
    fn test_absent_flag_means_nothing() {
        let flags = EffectFlags::from([("highlight", false)]);
        assert!(!flags.highlight());
        assert!(!flags.speak());
        assert_eq!(flags.active().count(), 0);
    }
}
