use anyhow::Result;
use serde::Deserialize;

use crate::audio::SourceConfig;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub engine: EngineConfig,
    pub audio: AudioConfig,
    pub transcripts: TranscriptsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the speech model; missing at startup is fatal
    pub model_path: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub block_samples: usize,
    pub channel_capacity: usize,
    pub gain: f32,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptsConfig {
    pub output_dir: String,
}

impl Config {
    /// Load from a TOML file; the file and every key are optional.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .set_default("service.name", "voxscribe")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8791_i64)?
            .set_default("engine.model_path", "models/vosk-model-small-en-us-0.15")?
            .set_default("audio.block_samples", 4000_i64)?
            .set_default("audio.channel_capacity", 64_i64)?
            .set_default("audio.gain", 1.0_f64)?
            .set_default("transcripts.output_dir", "transcripts")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session configuration derived from the file config.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            source: SourceConfig {
                block_samples: self.audio.block_samples,
                channel_capacity: self.audio.channel_capacity,
            },
            output_dir: self.transcripts.output_dir.clone().into(),
            initial_gain: self.audio.gain,
        }
    }
}
