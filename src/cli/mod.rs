//! Command-line interface for vpilot.
//!
//! Drives the orchestration core against a live backend: generate and
//! track jobs, send turns, speak text, and watch live state. Downstream
//! effects are logged rather than rendered.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{HttpBackend, LiveStateBackend};
use crate::config::{load_settings, LoadedSettings};
use crate::core::{JobHandle, Session};
use crate::domain::{JobId, JobPayload, SpeechOutcome, TerminalResult, TurnInput, TurnResult};
use crate::presentation::Presentation;

/// vpilot - remote orchestration client for generation, turns and live state
#[derive(Parser, Debug)]
#[command(name = "vpilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: nearest .vpilot/config.yaml, then ~/.vpilot/config.yaml)
    #[arg(long, global = true, env = "VPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a generation job and wait for the artifact
    Generate {
        /// JPEG image to reconstruct
        #[arg(short, long, conflicts_with = "prompt", required_unless_present = "prompt")]
        image: Option<PathBuf>,

        /// Text prompt
        #[arg(short, long)]
        prompt: Option<String>,

        /// Artifact name (defaults to the configured name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Wait for an already-submitted job
    Status {
        /// Job ID returned by the generator
        job_id: String,
    },

    /// Send a text or segment turn
    Ask {
        /// Text to send
        #[arg(conflicts_with = "segment", required_unless_present = "segment")]
        text: Option<String>,

        /// Segment group to ask about
        #[arg(short, long, requires = "label")]
        segment: Option<String>,

        /// Label of the segment group
        #[arg(short, long)]
        label: Option<String>,

        /// Voice for the spoken reply
        #[arg(long)]
        voice: Option<String>,
    },

    /// Send a recorded WAV file as a voice turn
    Voice {
        /// WAV file to send
        #[arg(short, long)]
        wav: PathBuf,
    },

    /// Speak a line of text
    Say {
        text: String,

        /// Emotion tag shown with the message
        #[arg(short, long)]
        emotion: Option<String>,
    },

    /// Poll live state and log every change
    Watch {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Check the backend health endpoint
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let loaded = self.settings()?;

        match self.command {
            Commands::Config => show_config(&loaded),
            Commands::Health => check_health(&loaded).await,
            Commands::Generate {
                image,
                prompt,
                name,
            } => {
                let session = open_session(loaded)?;
                let name = name.unwrap_or_else(|| session.settings().jobs.artifact_name.clone());
                let payload = match (image, prompt) {
                    (Some(path), _) => JobPayload::Image {
                        jpeg: read_file(&path)?,
                        name,
                    },
                    (None, Some(text)) => JobPayload::Prompt { text, name },
                    (None, None) => anyhow::bail!("Provide --image or --prompt"),
                };
                generate(&session, payload).await
            }
            Commands::Status { job_id } => {
                let session = open_session(loaded)?;
                let handle =
                    JobHandle::attach(JobId::new(job_id), session.settings().jobs.timeout());
                let result = session.jobs().await_job(handle).await;
                report_terminal(&result)
            }
            Commands::Ask {
                text,
                segment,
                label,
                voice,
            } => {
                let mut input = match (text, segment) {
                    (Some(text), _) => TurnInput::text(text),
                    (None, Some(segment)) => {
                        TurnInput::segment(segment, label.unwrap_or_default())
                    }
                    (None, None) => anyhow::bail!("Provide text or --segment"),
                };
                if let Some(voice) = voice {
                    input = input.with_voice(voice);
                }
                ask(&open_session(loaded)?, input).await
            }
            Commands::Voice { wav } => {
                let input = TurnInput::audio(read_file(&wav)?);
                ask(&open_session(loaded)?, input).await
            }
            Commands::Say { text, emotion } => {
                let session = open_session(loaded)?;
                let outcome = session.turns().speak_reply(&text, emotion.as_deref()).await;
                print_speech(&outcome);
                Ok(())
            }
            Commands::Watch { duration } => watch(&open_session(loaded)?, duration).await,
        }
    }

    fn settings(&self) -> Result<LoadedSettings> {
        let mut loaded = load_settings(self.config.as_deref())?;
        if let Some(base_url) = &self.base_url {
            loaded.settings.base_url = base_url.clone();
            loaded.settings.validate()?;
        }
        Ok(loaded)
    }
}

fn open_session(loaded: LoadedSettings) -> Result<Session> {
    Session::new(loaded.settings, Presentation::logging()).context("Failed to create session")
}

/// Submit a job, wait for it, and print the outcome
async fn generate(session: &Session, payload: JobPayload) -> Result<()> {
    let result = session
        .jobs()
        .generate(payload)
        .await
        .context("Job submission failed")?;
    report_terminal(&result)
}

fn report_terminal(result: &TerminalResult) -> Result<()> {
    match result {
        TerminalResult::Success { artifact_ref } => {
            println!("{}", artifact_ref);
            eprintln!("\n[{}]", result.status_text());
            Ok(())
        }
        TerminalResult::Failure { .. } | TerminalResult::TimedOut => {
            eprintln!("\n[{}]", result.status_text());
            std::process::exit(1);
        }
    }
}

async fn ask(session: &Session, input: TurnInput) -> Result<()> {
    let result = session.turns().dispatch(input).await?;
    print_turn(&result);
    Ok(())
}

fn print_turn(result: &TurnResult) {
    if let Some(heard) = &result.user_text {
        println!("You:      {}", heard);
    }
    println!("Reply:    {}", result.message);
    if let Some(emotion) = &result.emotion {
        println!("Emotion:  {}", emotion);
    }
    if let Some(intent) = &result.intent {
        println!("Intent:   {}", intent);
    }
    let effects: Vec<&str> = result.effects.active().collect();
    if !effects.is_empty() {
        println!("Effects:  {}", effects.join(", "));
    }
    if let Some(artifact) = &result.artifact_ref {
        println!("Artifact: {}", artifact);
    }
    print_speech(&result.speech);
}

fn print_speech(outcome: &SpeechOutcome) {
    match outcome {
        SpeechOutcome::NotRequested => {}
        SpeechOutcome::Played => eprintln!("[speech played]"),
        SpeechOutcome::Degraded { reason } => eprintln!("[speech unavailable: {}]", reason),
    }
}

/// Poll live state until the duration elapses or Ctrl-C
async fn watch(session: &Session, duration: Option<u64>) -> Result<()> {
    let handle = session.live_sync().start();

    match duration {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?,
    }

    let last = handle.snapshot();
    let stats = handle.stop().await;

    println!("Polls:      {}", stats.polls);
    println!("Propagated: {}", stats.propagated);
    println!("Errors:     {}", stats.errors);
    if let Some(state) = last {
        println!(
            "Last state: x={:.3} y={:.3} segment={}",
            state.x,
            state.y,
            state.segment().unwrap_or("-")
        );
    }

    Ok(())
}

async fn check_health(loaded: &LoadedSettings) -> Result<()> {
    let backend = HttpBackend::new(&loaded.settings)?;
    match backend.health().await {
        Ok(()) => {
            println!("{} is healthy", loaded.settings.base_url);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} is not healthy: {}", loaded.settings.base_url, e);
            std::process::exit(1);
        }
    }
}

fn show_config(loaded: &LoadedSettings) -> Result<()> {
    let settings = &loaded.settings;

    println!("vpilot configuration");
    println!();
    println!(
        "Config file: {}",
        loaded
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Base URL:    {}", settings.base_url);
    println!("Request timeout: {}ms", settings.request_timeout_ms);
    println!();
    println!("Jobs:");
    println!("  Timeout:       {}ms", settings.jobs.timeout_ms);
    println!("  Poll interval: {}ms", settings.jobs.poll_interval_ms);
    println!("  Artifact name: {}", settings.jobs.artifact_name);
    println!();
    println!("Turns:");
    println!("  Timeout:        {}ms", settings.turns.timeout_ms);
    println!("  Speech timeout: {}ms", settings.turns.speech_timeout_ms);
    println!(
        "  Default voice:  {}",
        settings.turns.default_voice_id.as_deref().unwrap_or("(server default)")
    );
    println!("  Speak every reply: {}", settings.turns.speak_every_reply);
    println!();
    println!("Live:");
    println!("  Poll interval:  {}ms", settings.live.poll_interval_ms);
    println!("  Error cooldown: {}ms", settings.live.error_cooldown_ms);
    println!("  Tolerance:      {}", settings.live.coordinate_tolerance);
    println!("  Segment switch: {:?}", settings.live.segment_switch);
    println!();
    println!("Capture:");
    println!("  Max length:  {}s", settings.capture.max_seconds);
    println!("  Sample rate: {}Hz", settings.capture.sample_rate);
    println!();
    println!("Endpoints:");
    let endpoints = &settings.endpoints;
    for (name, path) in [
        ("submit_job", &endpoints.submit_job),
        ("job_status", &endpoints.job_status),
        ("turn", &endpoints.turn),
        ("voice_turn", &endpoints.voice_turn),
        ("speech", &endpoints.speech),
        ("live_state", &endpoints.live_state),
        ("health", &endpoints.health),
    ] {
        println!("  {:<11} {}", name, settings.url(path));
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("File is empty: {}", path.display());
    }
    Ok(bytes)
}
