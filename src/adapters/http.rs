//! HTTP backend for the remote service.
//!
//! JSON endpoints for jobs, turns, speech and live state; voice turns are
//! uploaded as multipart (`audio` field, `voice.wav`).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    JobAccepted, JobBackend, JobStatusReport, LiveStateBackend, SpeechBackend, SpeechReply,
    SpeechRequest, TurnBackend,
};
use crate::config::{Endpoints, Settings};
use crate::domain::{JobId, JobPayload, LiveStateReport, TurnInput, TurnPayload, TurnReply};
use crate::error::{OrchestratorError, Result};

/// Request body for job submission
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_b64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    name: &'a str,
}

/// Server ids arrive either as numbers or strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl From<RawId> for JobId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => JobId::new(n.to_string()),
            RawId::Text(s) => JobId::new(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(alias = "buddy_id")]
    job_id: Option<RawId>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default, alias = "artifact_ref")]
    model_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TurnRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    segment_group_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice_id: Option<&'a str>,
    buddy_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TtsResponse {
    #[serde(default, alias = "audio_ref")]
    audio_url: Option<String>,
}

/// reqwest-based implementation of every backend trait
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    endpoints: Endpoints,
    client: reqwest::Client,
    /// Bound for live-state and health calls; other calls are bounded by their caller
    request_timeout: Duration,
}

impl HttpBackend {
    /// Create a backend from settings.
    ///
    /// Only connecting is bounded client-wide. Turn, speech and job deadlines
    /// belong to the components issuing them.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| OrchestratorError::Transport(e.to_string()))?;

        Ok(Self::with_client(settings, client))
    }

    /// Create a backend with a preconfigured client
    pub fn with_client(settings: &Settings, client: reqwest::Client) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            endpoints: settings.endpoints.clone(),
            client,
            request_timeout: settings.request_timeout(),
        }
    }

    /// Build API URL
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request bounded by the transport timeout
    async fn send_bounded(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OrchestratorError::Timeout(self.request_timeout)
                } else {
                    OrchestratorError::from(e)
                }
            })
    }

    /// Check the HTTP status and decode a JSON body strictly
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OrchestratorError::Transport(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!(%e, body = %body, "Rejected response body");
            OrchestratorError::Protocol(e.to_string())
        })
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit_job(&self, payload: &JobPayload) -> Result<JobAccepted> {
        let request = match payload {
            JobPayload::Image { jpeg, name } => GenerateRequest {
                image_b64: Some(BASE64.encode(jpeg)),
                prompt: None,
                name,
            },
            JobPayload::Prompt { text, name } => GenerateRequest {
                image_b64: None,
                prompt: Some(text.as_str()),
                name,
            },
        };

        let response = self
            .client
            .post(self.url(&self.endpoints.submit_job))
            .json(&request)
            .send()
            .await?;

        let accepted: GenerateResponse = Self::read_json(response).await?;
        let job_id = accepted
            .job_id
            .ok_or_else(|| OrchestratorError::Protocol("submission reply has no job id".into()))?;

        Ok(JobAccepted {
            job_id: job_id.into(),
            status: accepted.status,
        })
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport> {
        let path = self.endpoints.job_status_path(job_id.as_str());
        let response = self.client.get(self.url(&path)).send().await?;

        let status: StatusResponse = Self::read_json(response).await?;
        Ok(JobStatusReport {
            status: status.status,
            artifact_ref: status.model_url,
        })
    }
}

#[async_trait]
impl TurnBackend for HttpBackend {
    async fn post_turn(&self, input: &TurnInput) -> Result<TurnReply> {
        let request = match &input.payload {
            TurnPayload::Audio { wav } => {
                let part = Part::bytes(wav.clone())
                    .file_name("voice.wav")
                    .mime_str("audio/wav")?;

                let mut form = Form::new().part("audio", part);
                if let Some(target) = &input.target {
                    form = form.text("segment_group_id", target.clone());
                }

                self.client
                    .post(self.url(&self.endpoints.voice_turn))
                    .multipart(form)
            }
            TurnPayload::Segment { segment_id, label } => self
                .client
                .post(self.url(&self.endpoints.turn))
                .json(&TurnRequest {
                    segment_group_id: Some(segment_id.as_str()),
                    label: Some(label.as_str()),
                    text: None,
                }),
            TurnPayload::Text(text) => self
                .client
                .post(self.url(&self.endpoints.turn))
                .json(&TurnRequest {
                    segment_group_id: input.target.as_deref(),
                    label: None,
                    text: Some(text.as_str()),
                }),
        };

        let response = request.send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl SpeechBackend for HttpBackend {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechReply> {
        let response = self
            .client
            .post(self.url(&self.endpoints.speech))
            .json(&TtsRequest {
                text: &request.text,
                voice_id: request.voice_id.as_deref(),
                buddy_id: request.speaker_id.as_deref(),
            })
            .send()
            .await?;

        let reply: TtsResponse = Self::read_json(response).await?;
        Ok(SpeechReply {
            audio_ref: reply.audio_url,
        })
    }
}

#[async_trait]
impl LiveStateBackend for HttpBackend {
    async fn live_state(&self) -> Result<LiveStateReport> {
        let response = self
            .send_bounded(self.client.get(self.url(&self.endpoints.live_state)))
            .await?;
        Self::read_json(response).await
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .send_bounded(self.client.get(self.url(&self.endpoints.health)))
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(OrchestratorError::Transport(format!(
                "health check returned {}",
                status
            )))
        }
    }
}
