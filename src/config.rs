//! Configuration for the orchestration client.
//!
//! Configuration sources (highest priority first):
//! 1. Explicit path passed by the caller (CLI `--config`)
//! 2. `VPILOT_CONFIG` environment variable
//! 3. Config file `.vpilot/config.yaml` in the current directory or a parent
//! 4. `~/.vpilot/config.yaml`
//! 5. Defaults
//!
//! `VPILOT_BASE_URL` overrides the base URL of whatever was loaded.
//! Settings are resolved once at startup and handed to each component at
//! construction; nothing reads them from a global afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::SegmentSwitchPolicy;

const CONFIG_DIR: &str = ".vpilot";
const CONFIG_FILE: &str = "config.yaml";

/// Complete client settings (matches YAML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the remote service, e.g. `http://127.0.0.1:8000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Connect timeout, and the bound on live-state and health requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub jobs: JobSettings,

    #[serde(default)]
    pub turns: TurnSettings,

    #[serde(default)]
    pub live: LiveSettings,

    #[serde(default)]
    pub capture: CaptureSettings,

    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_request_timeout() -> u64 {
    10_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            jobs: JobSettings::default(),
            turns: TurnSettings::default(),
            live: LiveSettings::default(),
            capture: CaptureSettings::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build an absolute URL for a configured endpoint path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Reject settings that would make polling spin or never finish
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }
        if self.jobs.poll_interval_ms == 0 {
            anyhow::bail!("jobs.poll_interval_ms must be greater than zero");
        }
        if self.live.poll_interval_ms == 0 {
            anyhow::bail!("live.poll_interval_ms must be greater than zero");
        }
        if self.capture.max_seconds == 0 {
            anyhow::bail!("capture.max_seconds must be greater than zero");
        }
        if self.capture.sample_rate == 0 {
            anyhow::bail!("capture.sample_rate must be greater than zero");
        }
        if !self.endpoints.job_status.contains("{id}") {
            anyhow::bail!("endpoints.job_status must contain an {{id}} placeholder");
        }
        Ok(())
    }
}

/// Generation job policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Maximum time to wait for a job before reporting a timeout
    #[serde(default = "default_job_timeout")]
    pub timeout_ms: u64,

    /// Delay between status polls
    #[serde(default = "default_job_poll_interval")]
    pub poll_interval_ms: u64,

    /// Display name sent with each submission
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,
}

fn default_job_timeout() -> u64 {
    45_000
}
fn default_job_poll_interval() -> u64 {
    1_500
}
fn default_artifact_name() -> String {
    "Desk Buddy".to_string()
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_job_timeout(),
            poll_interval_ms: default_job_poll_interval(),
            artifact_name: default_artifact_name(),
        }
    }
}

impl JobSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Conversational turn policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSettings {
    #[serde(default = "default_turn_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_speech_timeout")]
    pub speech_timeout_ms: u64,

    /// Voice used for speech synthesis when the turn does not name one
    #[serde(default)]
    pub default_voice_id: Option<String>,

    /// Request speech for every non-empty reply, not only flagged ones
    #[serde(default)]
    pub speak_every_reply: bool,
}

fn default_turn_timeout() -> u64 {
    30_000
}
fn default_speech_timeout() -> u64 {
    15_000
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_turn_timeout(),
            speech_timeout_ms: default_speech_timeout(),
            default_voice_id: None,
            speak_every_reply: false,
        }
    }
}

impl TurnSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_millis(self.speech_timeout_ms)
    }
}

/// Live state synchronization policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSettings {
    #[serde(default = "default_live_poll_interval")]
    pub poll_interval_ms: u64,

    /// Minimum gap between two poll-error log lines
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_ms: u64,

    /// Absolute tolerance when comparing normalized coordinates
    #[serde(default = "default_coordinate_tolerance")]
    pub coordinate_tolerance: f32,

    /// How the front-end should retire the previous segment's objects
    #[serde(default)]
    pub segment_switch: SegmentSwitchPolicy,
}

fn default_live_poll_interval() -> u64 {
    100
}
fn default_error_cooldown() -> u64 {
    5_000
}
fn default_coordinate_tolerance() -> f32 {
    1e-4
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_live_poll_interval(),
            error_cooldown_ms: default_error_cooldown(),
            coordinate_tolerance: default_coordinate_tolerance(),
            segment_switch: SegmentSwitchPolicy::default(),
        }
    }
}

impl LiveSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_millis(self.error_cooldown_ms)
    }
}

/// Microphone capture limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_max_capture_seconds")]
    pub max_seconds: u64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_max_capture_seconds() -> u64 {
    15
}
fn default_sample_rate() -> u32 {
    16_000
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_seconds: default_max_capture_seconds(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl CaptureSettings {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_seconds)
    }
}

/// Remote endpoint paths, relative to `base_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub submit_job: String,
    /// Must contain `{id}`
    pub job_status: String,
    pub turn: String,
    pub voice_turn: String,
    pub speech: String,
    pub live_state: String,
    pub health: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            submit_job: "hyper3d/generate".to_string(),
            job_status: "hyper3d/status/{id}".to_string(),
            turn: "ai/segment".to_string(),
            voice_turn: "voice_command".to_string(),
            speech: "tts".to_string(),
            live_state: "selection".to_string(),
            health: "health".to_string(),
        }
    }
}

impl Endpoints {
    /// Status path for a specific job
    pub fn job_status_path(&self, job_id: &str) -> String {
        self.job_status.replace("{id}", job_id)
    }
}

/// Settings together with the file they came from
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Path to config file (if one was found)
    pub source: Option<PathBuf>,
}

/// Find config file by searching `start` and its parents
fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Locate the config file that applies to this process, if any
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("VPILOT_CONFIG") {
        return Some(PathBuf::from(path));
    }

    if let Some(found) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file_from(&cwd))
    {
        return Some(found);
    }

    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Load and parse a settings file
fn load_config_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load settings from all sources
pub fn load_settings(explicit: Option<&Path>) -> Result<LoadedSettings> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut settings = match source {
        Some(ref path) => load_config_file(path)?,
        None => Settings::default(),
    };

    if let Ok(base_url) = std::env::var("VPILOT_BASE_URL") {
        settings.base_url = base_url;
    }

    settings.validate()?;

    Ok(LoadedSettings { settings, source })
}
