use crate::config::Config;
use crate::state::AppState;
use crate::voice::{
    MicrophoneListener, OpenAiTts, OpenAiWhisperEngine, TtsSettings, VoiceSpeakerFactory,
};
use anyhow::Context;
use interview_core::prompt_loader::load_prompts;
use interview_core::prompts::PromptSet;
use interview_core::speech::{NoMicrophone, SilentSpeakerFactory, SpeakerFactory, SpeechInput};
use interview_core::{ChatSettings, InMemorySessionStore, InterviewerClient};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Wires the chat client, the speech adapters and the session store.
pub fn build_state(config: Config) -> anyhow::Result<AppState> {
    let prompts = match &config.prompts_dir {
        Some(dir) => {
            let overrides = load_prompts(dir)
                .with_context(|| format!("Failed to load prompts from {}", dir.display()))?;
            tracing::info!("Loaded {} prompt overrides.", overrides.len());
            PromptSet::with_overrides(overrides)
        }
        None => PromptSet::default(),
    };

    let mut settings = ChatSettings::new(config.provider, config.chat_api_key);
    if let Some(model) = &config.chat_model {
        settings = settings.with_model(model);
    }
    tracing::info!(provider = ?settings.provider(), model = settings.model(), "chat model selected");
    let interviewer = InterviewerClient::new(settings, prompts)?;

    let (listener, speakers): (Arc<dyn SpeechInput>, Arc<dyn SpeakerFactory>) = match config.voice {
        Some(voice) => {
            let engine = OpenAiWhisperEngine::new(
                SecretString::from(voice.api_key.expose_secret().to_owned()),
                None,
                Some(voice.transcription_model),
            )?;
            let tts = TtsSettings::new(voice.api_key, &voice.tts_model, &voice.tts_voice, voice.tts_speed);
            tracing::info!(voice = %tts.voice, model = %tts.model, "voice enabled");
            (
                Arc::new(MicrophoneListener::new(voice.input_device, Arc::new(engine))),
                Arc::new(VoiceSpeakerFactory::new(
                    Arc::new(OpenAiTts::new(tts)),
                    voice.output_device,
                )),
            )
        }
        None => {
            tracing::info!("voice disabled; speech requests are logged only");
            (Arc::new(NoMicrophone), Arc::new(SilentSpeakerFactory))
        }
    };

    Ok(AppState::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(interviewer),
        listener,
        speakers,
    ))
}
