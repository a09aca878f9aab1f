use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub audio: AudioConfig,
    pub interview: InterviewPrompts,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    /// Websocket endpoint of the live inference service
    pub url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Sample rate the live service expects (16kHz PCM)
    pub sample_rate: u32,
    /// Number of channels sent to the service (1 = mono)
    pub channels: u16,
    /// Outbound frame cadence in milliseconds
    pub frame_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct InterviewPrompts {
    pub system_prompt: String,
    pub opening_question: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
