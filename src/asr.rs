//! Microphone capture and speech recognition.
//!
//! The capture device, the recognition backend, and the vendor's
//! credential signing are host-runtime capabilities; each sits behind a
//! small trait so the utterance loop can run against fakes. The only
//! logic owned here is the silence-based auto-stop.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// One block of mono samples at the configured sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
}

pub type AudioStream = Pin<Box<dyn Stream<Item = Result<AudioFrame, AsrError>> + Send>>;

/// Recording settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AsrSettings {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Mean absolute amplitude below which a frame counts as silence.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    /// Seconds of continuous silence that end the utterance.
    #[serde(default = "default_silence_hold_secs")]
    pub silence_hold_secs: u64,
}

impl Default for AsrSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            secret_id: String::new(),
            secret_key: String::new(),
            engine: default_engine(),
            sample_rate: default_sample_rate(),
            silence_threshold: default_silence_threshold(),
            silence_hold_secs: default_silence_hold_secs(),
        }
    }
}

fn default_engine() -> String {
    "zh_CN".to_string()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_silence_threshold() -> f32 {
    0.01
}

fn default_silence_hold_secs() -> u64 {
    2
}

/// Errors from capture and recognition.
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("audio capture failed: {0}")]
    Capture(String),

    #[error("speech recognition failed: {0}")]
    Recognition(String),

    #[error("no audio captured")]
    NoAudio,
}

/// Microphone capture device.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Begin recording and return the frame stream.
    async fn start(&mut self) -> Result<AudioStream, AsrError>;
    /// Release the device.
    async fn stop(&mut self) -> Result<(), AsrError>;
}

/// Recognition backend turning a captured utterance into text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, samples: &[f32]) -> Result<String, AsrError>;
}

/// Opaque credential signing for vendor recognition APIs.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, params: &[(String, String)]) -> String;
}

/// Canonical parameter string consumed by signers: keys sorted, joined as
/// `k=v&k=v`.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Drives one record-then-recognize round trip.
pub struct AsrService {
    settings: AsrSettings,
    capture: Box<dyn AudioCapture>,
    recognizer: Box<dyn SpeechRecognizer>,
}

impl AsrService {
    pub fn new(
        settings: AsrSettings,
        capture: Box<dyn AudioCapture>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Self {
        Self {
            settings,
            capture,
            recognizer,
        }
    }

    /// Record until the silence hold elapses (or the device stops), then
    /// recognize the whole utterance.
    pub async fn capture_utterance(&mut self) -> Result<String, AsrError> {
        let mut frames = self.capture.start().await?;

        let hold_samples = (self.settings.sample_rate as u64 * self.settings.silence_hold_secs)
            as usize;
        let mut samples: Vec<f32> = Vec::new();
        let mut silent_run = 0usize;

        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if frame.samples.is_empty() {
                continue;
            }

            if mean_amplitude(&frame.samples) < self.settings.silence_threshold {
                silent_run += frame.samples.len();
            } else {
                silent_run = 0;
            }
            samples.extend(frame.samples);

            if silent_run >= hold_samples {
                debug!(
                    captured = samples.len(),
                    "silence hold reached, stopping capture"
                );
                break;
            }
        }

        drop(frames);
        self.capture.stop().await?;

        if samples.is_empty() {
            return Err(AsrError::NoAudio);
        }

        self.recognizer.recognize(&samples).await
    }
}

fn mean_amplitude(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}
