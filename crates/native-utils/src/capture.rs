//! Single-utterance microphone capture.
//!
//! The input stream is opened per call, the energy threshold is calibrated
//! against the room for a couple of seconds, and the call returns once the
//! speaker has paused long enough. There is no overall timeout.

use crate::audio;
use crate::device;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use std::sync::mpsc;
use std::time::Duration;

pub const CALIBRATION_DURATION: Duration = Duration::from_secs(2);
pub const PAUSE_DURATION: Duration = Duration::from_secs(2);
pub const MIN_SPEECH_DURATION: Duration = Duration::from_millis(250);
/// Lowest RMS energy that may count as speech, whatever the room sounds like.
pub const ENERGY_FLOOR: f32 = 0.01;
pub const ENERGY_MULTIPLIER: f32 = 3.0;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{0}")]
    DeviceUnavailable(String),
    #[error("input stream failed: {0}")]
    Stream(String),
}

/// Tuning for [`UtteranceDetector`].
#[derive(Debug, Clone, Copy)]
pub struct DetectorSettings {
    pub sample_rate: u32,
    pub calibration: Duration,
    pub pause: Duration,
    pub min_speech: Duration,
    pub energy_floor: f32,
    pub energy_multiplier: f32,
}

impl DetectorSettings {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            calibration: CALIBRATION_DURATION,
            pause: PAUSE_DURATION,
            min_speech: MIN_SPEECH_DURATION,
            energy_floor: ENERGY_FLOOR,
            energy_multiplier: ENERGY_MULTIPLIER,
        }
    }

    fn samples(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Calibrating,
    Waiting,
    Speaking,
}

/// Energy-based end-of-utterance detection over mono frames.
#[derive(Debug)]
pub struct UtteranceDetector {
    settings: DetectorSettings,
    phase: Phase,
    calibration_samples: usize,
    calibration_energy: f64,
    calibration_frames: u32,
    threshold: f32,
    speech: Vec<f32>,
    voiced_samples: usize,
    silent_samples: usize,
}

impl UtteranceDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            settings,
            phase: Phase::Calibrating,
            calibration_samples: 0,
            calibration_energy: 0.0,
            calibration_frames: 0,
            threshold: settings.energy_floor,
            speech: Vec::new(),
            voiced_samples: 0,
            silent_samples: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_calibrating(&self) -> bool {
        self.phase == Phase::Calibrating
    }

    /// Feeds one frame. Returns the utterance once it has ended.
    ///
    /// Trailing silence is trimmed from the returned samples. Bursts shorter
    /// than the minimum speech duration are dropped and listening resumes.
    pub fn push(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        if frame.is_empty() {
            return None;
        }
        let energy = rms_energy(frame);

        match self.phase {
            Phase::Calibrating => {
                self.calibration_energy += energy as f64;
                self.calibration_frames += 1;
                self.calibration_samples += frame.len();
                if self.calibration_samples >= self.settings.samples(self.settings.calibration) {
                    let ambient = (self.calibration_energy / self.calibration_frames as f64) as f32;
                    self.threshold =
                        (ambient * self.settings.energy_multiplier).max(self.settings.energy_floor);
                    self.phase = Phase::Waiting;
                    tracing::debug!(ambient, threshold = self.threshold, "microphone calibrated");
                }
                None
            }
            Phase::Waiting => {
                if energy > self.threshold {
                    self.phase = Phase::Speaking;
                    self.speech.clear();
                    self.speech.extend_from_slice(frame);
                    self.voiced_samples = frame.len();
                    self.silent_samples = 0;
                }
                None
            }
            Phase::Speaking => {
                self.speech.extend_from_slice(frame);
                if energy > self.threshold {
                    self.voiced_samples += frame.len();
                    self.silent_samples = 0;
                } else {
                    self.silent_samples += frame.len();
                }

                if self.silent_samples < self.settings.samples(self.settings.pause) {
                    return None;
                }

                self.phase = Phase::Waiting;
                if self.voiced_samples < self.settings.samples(self.settings.min_speech) {
                    tracing::debug!(samples = self.voiced_samples, "ignoring short noise burst");
                    self.speech.clear();
                    return None;
                }
                let keep = self.speech.len() - self.silent_samples;
                self.speech.truncate(keep);
                Some(std::mem::take(&mut self.speech))
            }
        }
    }
}

fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Mono audio at the capture device's native rate.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Utterance {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }
}

enum Captured {
    Frame(Vec<f32>),
    Lost(String),
}

/// Opens the input device for one utterance at a time.
#[derive(Debug, Clone, Default)]
pub struct UtteranceCapture {
    device_name: Option<String>,
}

impl UtteranceCapture {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    /// Blocks until one utterance has been captured.
    pub fn capture_utterance(&self) -> Result<Utterance, CaptureError> {
        let input = device::get_or_default_input(self.device_name.as_deref())
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{e:#}")))?;
        tracing::info!("Using input device: {:?}", input.name().unwrap_or_default());

        let supported = input
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        let config: StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;

        let (tx, rx) = mpsc::channel::<Captured>();
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_input::<f32>(&input, &config, tx),
            SampleFormat::I16 => build_input::<i16>(&input, &config, tx),
            SampleFormat::U16 => build_input::<u16>(&input, &config, tx),
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported input sample format {other:?}"
                )));
            }
        }
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let mut detector = UtteranceDetector::new(DetectorSettings::new(sample_rate));
        tracing::debug!("Calibrating for ambient noise...");

        loop {
            match rx.recv() {
                Ok(Captured::Frame(frame)) => {
                    if let Some(samples) = detector.push(&frame) {
                        drop(stream);
                        let utterance = Utterance {
                            samples,
                            sample_rate,
                        };
                        tracing::info!(
                            seconds = utterance.duration().as_secs_f32(),
                            "utterance captured"
                        );
                        return Ok(utterance);
                    }
                }
                Ok(Captured::Lost(reason)) => return Err(CaptureError::DeviceUnavailable(reason)),
                Err(_) => return Err(CaptureError::Stream("input stream closed".to_string())),
            }
        }
    }

    /// Captures one utterance and converts it to 16 kHz mono WAV bytes.
    pub fn capture_wav(&self) -> Result<Vec<u8>, CaptureError> {
        let utterance = self.capture_utterance()?;
        let samples = audio::resample(
            &utterance.samples,
            utterance.sample_rate,
            audio::TRANSCRIPTION_SAMPLE_RATE,
        )
        .map_err(|e| CaptureError::Stream(format!("{e:#}")))?;
        audio::encode_wav(&samples, audio::TRANSCRIPTION_SAMPLE_RATE)
            .map_err(|e| CaptureError::Stream(format!("{e:#}")))
    }
}

fn build_input<T>(
    input: &cpal::Device,
    config: &StreamConfig,
    tx: mpsc::Sender<Captured>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let error_tx = tx.clone();

    input.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples = data.iter().map(|s| s.to_sample::<f32>()).collect::<Vec<_>>();
            // The receiver is gone once the utterance is complete.
            let _ = tx.send(Captured::Frame(audio::to_mono(&samples, channels)));
        },
        move |err| {
            tracing::error!("An error occurred on input stream: {}", err);
            if let cpal::StreamError::DeviceNotAvailable = err {
                let _ = error_tx.send(Captured::Lost(err.to_string()));
            }
        },
        None,
    )
}
