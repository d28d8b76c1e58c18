//! Capture pipeline: record, trim, encode, hand off.
//!
//! A capture moves Idle -> Listening -> Processing -> Idle. Samples are
//! taken from a fixed-capacity device buffer, trimmed to the frames
//! actually recorded, encoded as 16-bit PCM WAV in memory and handed to a
//! [`PayloadSink`]. Nothing is ever sent for an empty recording.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CaptureSettings;
use crate::domain::{AudioPayload, CaptureFormat, CapturePayload, CaptureState};
use crate::error::{OrchestratorError, Result};
use crate::presentation::{StatusChannel, StatusSink};

/// Audio input hardware.
///
/// The device records into a buffer sized for the maximum capture length;
/// `read` may return more samples than were recorded (zero padding).
pub trait CaptureDevice: Send {
    fn name(&self) -> &str;

    /// Begin recording. Fails with [`OrchestratorError::DeviceUnavailable`]
    /// when no input hardware is present.
    fn start(&mut self, max_duration: Duration, sample_rate: u32) -> Result<CaptureFormat>;

    /// Stop recording and return the number of frames recorded
    fn stop(&mut self) -> usize;

    /// Interleaved samples in [-1.0, 1.0], possibly longer than recorded
    fn read(&mut self) -> Vec<f32>;
}

/// Placeholder used when the host has no microphone
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevice;

impl CaptureDevice for NoDevice {
    fn name(&self) -> &str {
        "none"
    }

    fn start(&mut self, _max_duration: Duration, _sample_rate: u32) -> Result<CaptureFormat> {
        Err(OrchestratorError::DeviceUnavailable(
            "no input device present".to_string(),
        ))
    }

    fn stop(&mut self) -> usize {
        0
    }

    fn read(&mut self) -> Vec<f32> {
        Vec::new()
    }
}

/// Source of still frames for image capture
pub trait FrameSource: Send {
    /// Grab the current frame as JPEG bytes
    fn capture_frame(&mut self) -> Result<Vec<u8>>;
}

/// Receives finished captures; must not block
pub trait PayloadSink: Send + Sync {
    fn submit(&self, payload: CapturePayload);
}

/// What a call to [`CapturePipeline::stop`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Not listening; nothing happened
    Ignored,
    /// Nothing was recorded; nothing was sent
    Empty,
    /// A payload was handed to the sink
    Sent { frames: usize, duration: Duration },
}

#[derive(Debug, Clone, Copy)]
struct CaptureSession {
    started: Instant,
    max_duration: Duration,
    format: CaptureFormat,
}

/// Drives one capture device through record/encode/hand-off cycles
pub struct CapturePipeline {
    device: Box<dyn CaptureDevice>,
    sink: Arc<dyn PayloadSink>,
    status: Arc<dyn StatusSink>,
    settings: CaptureSettings,
    state: CaptureState,
    session: Option<CaptureSession>,
}

impl CapturePipeline {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        sink: Arc<dyn PayloadSink>,
        status: Arc<dyn StatusSink>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            device,
            sink,
            status,
            settings,
            state: CaptureState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// When the running capture must stop at the latest
    pub fn deadline(&self) -> Option<Instant> {
        self.session.map(|s| s.started + s.max_duration)
    }

    fn set_state(&mut self, state: CaptureState) {
        self.state = state;
        self.status.set_status(StatusChannel::Capture, state.label());
    }

    /// Start recording. Does nothing unless idle.
    pub fn start(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            debug!(state = ?self.state, "Capture start ignored");
            return Ok(());
        }

        let max_duration = self.settings.max_duration();
        let format = match self.device.start(max_duration, self.settings.sample_rate) {
            Ok(format) => format,
            Err(e) => {
                warn!(device = self.device.name(), error = %e, "Capture device failed to start");
                self.status
                    .set_status(StatusChannel::Capture, &e.status_text());
                return Err(e);
            }
        };

        info!(
            device = self.device.name(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Capture started"
        );

        self.session = Some(CaptureSession {
            started: Instant::now(),
            max_duration,
            format,
        });
        self.set_state(CaptureState::Listening);
        Ok(())
    }

    /// Stop recording, encode what was captured, and hand it to the sink.
    ///
    /// Ignored unless listening. A zero-length recording returns to idle
    /// without sending anything.
    pub fn stop(&mut self) -> Result<StopOutcome> {
        if self.state != CaptureState::Listening {
            debug!(state = ?self.state, "Capture stop ignored");
            return Ok(StopOutcome::Ignored);
        }
        let Some(session) = self.session.take() else {
            self.set_state(CaptureState::Idle);
            return Ok(StopOutcome::Ignored);
        };

        let capacity = session.format.sample_rate as usize * self.settings.max_seconds as usize;
        let frames = self.device.stop().min(capacity);

        if frames == 0 {
            info!("Capture ended with no audio");
            self.state = CaptureState::Idle;
            self.status.set_status(
                StatusChannel::Capture,
                &OrchestratorError::EmptyInput.status_text(),
            );
            return Ok(StopOutcome::Empty);
        }

        self.set_state(CaptureState::Processing);

        let mut samples = self.device.read();
        samples.truncate(frames * session.format.channels as usize);

        let wav = match encode_wav(&samples, session.format) {
            Ok(wav) => wav,
            Err(e) => {
                warn!(error = %e, "Failed to encode capture");
                self.state = CaptureState::Idle;
                self.status
                    .set_status(StatusChannel::Capture, &e.status_text());
                return Err(e);
            }
        };

        let payload = AudioPayload {
            wav,
            frames,
            format: session.format,
        };
        let duration = payload.duration();

        info!(
            frames,
            duration_ms = duration.as_millis() as u64,
            bytes = payload.wav.len(),
            "Capture encoded"
        );
        self.sink.submit(CapturePayload::Audio(payload));

        self.set_state(CaptureState::Idle);
        Ok(StopOutcome::Sent { frames, duration })
    }

    /// Start when idle, stop when listening (the capture button)
    pub fn toggle(&mut self) -> Result<StopOutcome> {
        match self.state {
            CaptureState::Idle => self.start().map(|_| StopOutcome::Ignored),
            CaptureState::Listening => self.stop(),
            CaptureState::Processing => Ok(StopOutcome::Ignored),
        }
    }

    /// Stop automatically once the maximum capture length is reached.
    ///
    /// Returns `None` while the capture may continue.
    pub fn enforce_ceiling(&mut self) -> Option<Result<StopOutcome>> {
        let deadline = self.deadline()?;
        if self.state != CaptureState::Listening || Instant::now() < deadline {
            return None;
        }

        info!("Capture reached its maximum length");
        Some(self.stop())
    }

    /// Grab one still frame and hand it to the sink.
    ///
    /// Refused while an audio capture is in progress.
    pub fn capture_image(&mut self, source: &mut dyn FrameSource) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(OrchestratorError::Busy);
        }

        let jpeg = source.capture_frame()?;
        if jpeg.is_empty() {
            self.status.set_status(
                StatusChannel::Capture,
                &OrchestratorError::EmptyInput.status_text(),
            );
            return Err(OrchestratorError::EmptyInput);
        }

        info!(bytes = jpeg.len(), "Image captured");
        self.sink.submit(CapturePayload::Image { jpeg });
        Ok(())
    }
}

/// Encode interleaved float samples as 16-bit PCM WAV bytes
pub fn encode_wav(samples: &[f32], format: CaptureFormat) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| OrchestratorError::Encoding(format!("WAV header: {}", e)))?;

        for &sample in samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| OrchestratorError::Encoding(format!("WAV sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| OrchestratorError::Encoding(format!("WAV finalize: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
