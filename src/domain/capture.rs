//! Capture states and the payloads a finished capture produces.

use std::time::Duration;

/// Capture pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Listening,
    Processing,
}

impl CaptureState {
    /// Label for the capture button
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Tap to speak",
            Self::Listening => "Listening... tap to stop",
            Self::Processing => "Processing...",
        }
    }
}

/// Sample format reported by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl CaptureFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }

    /// Duration of `frames` frames in this format
    pub fn duration_of(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

/// Encoded recording ready for transmission
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// 16-bit PCM WAV bytes
    pub wav: Vec<u8>,
    /// Frames actually recorded (after trimming)
    pub frames: usize,
    pub format: CaptureFormat,
}

impl AudioPayload {
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.frames)
    }
}

/// Finished capture handed to a dispatcher or job poller
#[derive(Debug, Clone)]
pub enum CapturePayload {
    Audio(AudioPayload),
    /// Encoded still frame (JPEG)
    Image { jpeg: Vec<u8> },
}
