//! Concrete speech adapters backed by OpenAI and the local audio devices.

pub mod listener;
pub mod speaker;
pub mod transcription;

pub use listener::MicrophoneListener;
pub use speaker::{
    OpenAiTts, PlaybackThread, Synthesizer, SynthesizerSource, TtsSettings, VoiceSpeaker,
    VoiceSpeakerFactory,
};
pub use transcription::{OpenAiWhisperEngine, TranscriptionEngine, TranscriptionError};
