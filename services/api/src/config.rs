use interview_core::ChatProvider;
use secrecy::SecretString;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the text-to-speech and transcription adapters.
#[derive(Debug)]
pub struct VoiceConfig {
    pub api_key: SecretString,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
    pub transcription_model: String,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: ChatProvider,
    pub chat_api_key: SecretString,
    pub chat_model: Option<String>,
    /// `None` when voice is disabled.
    pub voice: Option<VoiceConfig>,
    pub prompts_dir: Option<PathBuf>,
    pub static_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "127.0.0.1:5000".
    /// *   `LLM_PROVIDER`: "gemini" or "openai". Defaults to "gemini".
    /// *   `GEMINI_API_KEY`: Required if provider is "gemini".
    /// *   `OPENAI_API_KEY`: Required if provider is "openai", and for voice.
    /// *   `CHAT_MODEL`: (Optional) Overrides the provider's default model.
    /// *   `VOICE_ENABLED`: (Optional) Defaults to "true".
    /// *   `TTS_MODEL`, `TTS_VOICE`, `TTS_SPEED`: (Optional) Speech output settings.
    /// *   `TRANSCRIPTION_MODEL`: (Optional) Defaults to "whisper-1".
    /// *   `INPUT_DEVICE`, `OUTPUT_DEVICE`: (Optional) Audio device names.
    /// *   `PROMPTS_DIR`: (Optional) Directory of `.md` prompt overrides.
    /// *   `STATIC_DIR`: (Optional) Browser frontend. Defaults to "static".
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    ///
    /// `overrides` takes precedence over the environment, for command-line flags.
    pub fn from_env<F>(overrides: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| overrides(key).or_else(|| env::var(key).ok()))
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = var("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => ChatProvider::Gemini,
            "openai" => ChatProvider::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{other}' is not one of gemini, openai"),
                ));
            }
        };

        let openai_api_key = var("OPENAI_API_KEY");
        let gemini_api_key = var("GEMINI_API_KEY");

        // Validate that the required API key is present for the selected provider.
        let chat_api_key = match provider {
            ChatProvider::OpenAi => openai_api_key.clone().ok_or_else(|| {
                ConfigError::MissingVar("OPENAI_API_KEY must be set for 'openai' provider".to_string())
            })?,
            ChatProvider::Gemini => gemini_api_key.ok_or_else(|| {
                ConfigError::MissingVar("GEMINI_API_KEY must be set for 'gemini' provider".to_string())
            })?,
        };

        let voice_enabled = match var("VOICE_ENABLED") {
            Some(value) => parse_bool("VOICE_ENABLED", &value)?,
            None => true,
        };

        let voice = if voice_enabled {
            let api_key = openai_api_key.ok_or_else(|| {
                ConfigError::MissingVar(
                    "OPENAI_API_KEY must be set when VOICE_ENABLED is true".to_string(),
                )
            })?;
            let speed_str = var("TTS_SPEED").unwrap_or_else(|| "1.0".to_string());
            let tts_speed = speed_str
                .parse::<f32>()
                .ok()
                .filter(|speed| (0.25..=4.0).contains(speed))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "TTS_SPEED".to_string(),
                        format!("'{speed_str}' is not a number between 0.25 and 4.0"),
                    )
                })?;
            Some(VoiceConfig {
                api_key: SecretString::from(api_key),
                tts_model: var("TTS_MODEL").unwrap_or_else(|| "tts-1".to_string()),
                tts_voice: var("TTS_VOICE").unwrap_or_else(|| "alloy".to_string()),
                tts_speed,
                transcription_model: var("TRANSCRIPTION_MODEL")
                    .unwrap_or_else(|| "whisper-1".to_string()),
                input_device: var("INPUT_DEVICE"),
                output_device: var("OUTPUT_DEVICE"),
            })
        } else {
            None
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            provider,
            chat_api_key: SecretString::from(chat_api_key),
            chat_model: var("CHAT_MODEL"),
            voice,
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            log_level,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{value}' is not a boolean"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_gemini_and_voice_off() {
        let config = load(&[("GEMINI_API_KEY", "g-key"), ("VOICE_ENABLED", "false")]).unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:5000");
        assert_eq!(config.provider, ChatProvider::Gemini);
        assert!(config.voice.is_none());
        assert!(config.chat_model.is_none());
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn voice_requires_an_openai_key() {
        let err = load(&[("GEMINI_API_KEY", "g-key")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));

        let config = load(&[("GEMINI_API_KEY", "g-key"), ("OPENAI_API_KEY", "o-key")]).unwrap();
        let voice = config.voice.unwrap();
        assert_eq!(voice.tts_model, "tts-1");
        assert_eq!(voice.tts_voice, "alloy");
        assert_eq!(voice.tts_speed, 1.0);
        assert_eq!(voice.transcription_model, "whisper-1");
    }

    #[test]
    fn provider_key_is_validated() {
        let err = load(&[("LLM_PROVIDER", "openai"), ("VOICE_ENABLED", "no")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = load(&[("LLM_PROVIDER", "claude"), ("GEMINI_API_KEY", "g")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "LLM_PROVIDER"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [("GEMINI_API_KEY", "g"), ("VOICE_ENABLED", "off")];

        let mut vars = base.to_vec();
        vars.push(("BIND_ADDRESS", "localhost"));
        assert!(load(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("RUST_LOG", "chatty"));
        assert!(load(&vars).is_err());

        let err = load(&[("GEMINI_API_KEY", "g"), ("OPENAI_API_KEY", "o"), ("TTS_SPEED", "9")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "TTS_SPEED"));
    }
}
