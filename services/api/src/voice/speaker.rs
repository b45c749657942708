//! Spoken output through OpenAI text-to-speech and the local speakers.
//!
//! Every [`VoiceSpeaker`] owns one worker thread, started on first use. The
//! audio output stream is opened, used and dropped on that thread only.

use anyhow::Context;
use interview_core::speech::{SpeakMode, SpeakerFactory, SpeakerState, SpeechOutput};
use interview_native_utils::audio::{self, TTS_PCM16_SAMPLE_RATE};
use interview_native_utils::playback::{PcmPlayer, PlaybackEnd};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-to-speech request settings shared by every session.
#[derive(Debug)]
pub struct TtsSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub speed: f32,
}

impl TtsSettings {
    pub fn new(api_key: SecretString, model: &str, voice: &str, speed: f32) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.to_string(),
            voice: voice.to_string(),
            speed,
        }
    }
}

/// The worker thread a speaker plays on.
#[derive(Debug, Clone, Default)]
pub struct PlaybackThread {
    pub name: String,
    pub output_device: Option<String>,
}

/// Turns text into mono samples at [`TTS_PCM16_SAMPLE_RATE`]. Lives on the
/// playback thread that opened it.
pub trait Synthesizer {
    fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Opens a [`Synthesizer`] on each playback thread.
pub trait SynthesizerSource: Send + Sync {
    fn open(&self) -> anyhow::Result<Box<dyn Synthesizer>>;
}

/// OpenAI `audio/speech` with raw PCM output.
pub struct OpenAiTts {
    settings: Arc<TtsSettings>,
}

impl OpenAiTts {
    pub fn new(settings: TtsSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl SynthesizerSource for OpenAiTts {
    // The blocking client is built here, on the playback thread, because it
    // may not be created inside the async runtime.
    fn open(&self) -> anyhow::Result<Box<dyn Synthesizer>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()
            .context("Failed to build speech HTTP client")?;
        Ok(Box::new(OpenAiTtsClient {
            client,
            settings: Arc::clone(&self.settings),
        }))
    }
}

struct OpenAiTtsClient {
    client: reqwest::blocking::Client,
    settings: Arc<TtsSettings>,
}

impl Synthesizer for OpenAiTtsClient {
    fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let settings = &self.settings;
        let request = SpeechRequest {
            model: &settings.model,
            input: text,
            voice: &settings.voice,
            response_format: "pcm",
            speed: settings.speed,
        };
        let bytes = self
            .client
            .post(format!("{}/audio/speech", settings.base_url))
            .bearer_auth(settings.api_key.expose_secret())
            .json(&request)
            .send()
            .context("Speech request failed")?
            .error_for_status()
            .context("Speech service returned an error")?
            .bytes()
            .context("Failed to read synthesized audio")?;

        tracing::debug!(bytes = bytes.len(), "speech synthesized");
        Ok(audio::decode_pcm16_le(&bytes))
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

struct Job {
    text: String,
    generation: u64,
    /// Dropped when the job is finished or purged, which wakes the caller.
    _done: Option<mpsc::SyncSender<()>>,
}

enum Command {
    Speak(Job),
    Shutdown,
}

struct Shared {
    state: Mutex<SpeakerState>,
    /// Bumped by `stop`; jobs from an older generation are skipped or cut.
    generation: AtomicU64,
    pending: AtomicUsize,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SpeakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn job_finished(&self) {
        let left = self.pending.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
        let mut state = self.state();
        if left == 0 && *state == SpeakerState::Speaking {
            *state = SpeakerState::Ready;
        }
    }
}

struct Worker {
    tx: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

pub struct VoiceSpeaker {
    session_id: String,
    synthesis: Arc<dyn SynthesizerSource>,
    thread: PlaybackThread,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl VoiceSpeaker {
    pub fn new(
        session_id: &str,
        synthesis: Arc<dyn SynthesizerSource>,
        thread: PlaybackThread,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            synthesis,
            thread,
            shared: Arc::new(Shared {
                state: Mutex::new(SpeakerState::Uninitialized),
                generation: AtomicU64::new(0),
                pending: AtomicUsize::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_worker(&self) -> anyhow::Result<Worker> {
        let (tx, rx) = mpsc::channel();
        let synthesis = Arc::clone(&self.synthesis);
        let shared = Arc::clone(&self.shared);
        let output_device = self.thread.output_device.clone();

        let handle = thread::Builder::new()
            .name(self.thread.name.clone())
            .spawn(move || run_worker(rx, synthesis.as_ref(), shared, output_device))
            .context("Failed to spawn playback thread")?;

        tracing::debug!(session = %self.session_id, "playback thread started");
        *self.shared.state() = SpeakerState::Ready;
        Ok(Worker { tx, handle })
    }
}

impl SpeechOutput for VoiceSpeaker {
    fn speak(&self, text: &str, mode: SpeakMode) {
        if text.trim().is_empty() {
            return;
        }

        let (done_tx, done_rx) = match mode {
            SpeakMode::Blocking => {
                let (tx, rx) = mpsc::sync_channel(1);
                (Some(tx), Some(rx))
            }
            SpeakMode::Detached => (None, None),
        };
        let job = Job {
            text: text.to_string(),
            generation: self.shared.generation(),
            _done: done_tx,
        };

        {
            let mut worker = self.worker();
            if worker.is_none() {
                match self.spawn_worker() {
                    Ok(spawned) => *worker = Some(spawned),
                    Err(e) => {
                        tracing::error!(session = %self.session_id, "Speech unavailable: {e:#}");
                        return;
                    }
                }
            }
            let Some(worker) = worker.as_ref() else { return };

            self.shared.pending.fetch_add(1, Ordering::AcqRel);
            *self.shared.state() = SpeakerState::Speaking;
            if worker.tx.send(Command::Speak(job)).is_err() {
                tracing::error!(session = %self.session_id, "Playback thread is gone");
                self.shared.job_finished();
                return;
            }
        }

        if let Some(done) = done_rx {
            // Err means the job was finished or purged; either way we are done.
            let _ = done.recv();
        }
    }

    fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        *self.shared.state() = SpeakerState::Stopped;
        tracing::info!(session = %self.session_id, "speech stopped");
    }

    fn state(&self) -> SpeakerState {
        *self.shared.state()
    }
}

impl Drop for VoiceSpeaker {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let worker = self.worker().take();
        if let Some(worker) = worker {
            let _ = worker.tx.send(Command::Shutdown);
            if worker.handle.join().is_err() {
                tracing::error!(session = %self.session_id, "playback thread panicked");
            }
            tracing::debug!(session = %self.session_id, "playback thread joined");
        }
    }
}

fn run_worker(
    rx: mpsc::Receiver<Command>,
    synthesis: &dyn SynthesizerSource,
    shared: Arc<Shared>,
    output_device: Option<String>,
) {
    let synthesizer = match synthesis.open() {
        Ok(synthesizer) => Some(synthesizer),
        Err(e) => {
            tracing::error!("Speech synthesis unavailable: {e:#}");
            None
        }
    };
    let mut player: Option<PcmPlayer> = None;

    while let Ok(command) = rx.recv() {
        let job = match command {
            Command::Speak(job) => job,
            Command::Shutdown => break,
        };
        let cancelled = || shared.generation() != job.generation;

        if cancelled() {
            tracing::debug!("skipping purged utterance");
        } else if let Some(synthesizer) = synthesizer.as_ref() {
            match synthesizer.synthesize(&job.text) {
                Ok(samples) if !cancelled() => {
                    play(&mut player, output_device.as_deref(), &samples, cancelled)
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Speech synthesis failed: {e:#}"),
            }
        }

        shared.job_finished();
    }

    // The output stream is dropped here, on the thread that created it.
    drop(player);
}

fn play<F>(player: &mut Option<PcmPlayer>, output_device: Option<&str>, samples: &[f32], cancelled: F)
where
    F: Fn() -> bool,
{
    if player.is_none() {
        match PcmPlayer::open(output_device) {
            Ok(opened) => *player = Some(opened),
            Err(e) => {
                tracing::error!("Speaker unavailable: {e:#}");
                return;
            }
        }
    }
    let Some(output) = player.as_mut() else { return };

    match output.play(samples, TTS_PCM16_SAMPLE_RATE as u32, cancelled) {
        Ok(PlaybackEnd::Finished) => tracing::debug!("utterance played"),
        Ok(PlaybackEnd::Interrupted) => tracing::debug!("utterance interrupted"),
        Err(e) => {
            tracing::error!("Playback failed: {e:#}");
            // Reopen the device next time.
            *player = None;
        }
    }
}

/// Creates one [`VoiceSpeaker`] per session.
pub struct VoiceSpeakerFactory {
    synthesis: Arc<dyn SynthesizerSource>,
    output_device: Option<String>,
}

impl VoiceSpeakerFactory {
    pub fn new(synthesis: Arc<dyn SynthesizerSource>, output_device: Option<String>) -> Self {
        Self {
            synthesis,
            output_device,
        }
    }
}

impl SpeakerFactory for VoiceSpeakerFactory {
    fn create(&self, session_id: &str) -> Arc<dyn SpeechOutput> {
        let short_id = session_id.get(..8).unwrap_or(session_id);
        Arc::new(VoiceSpeaker::new(
            session_id,
            Arc::clone(&self.synthesis),
            PlaybackThread {
                name: format!("speech-{short_id}"),
                output_device: self.output_device.clone(),
            },
        ))
    }
}
