use std::path::Path;

use tracing::info;
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

use crate::audio::frame::SAMPLE_RATE;
use crate::error::{PipelineError, Result};
use crate::stt::{EngineFactory, Recognition, SpeechEngine};

/// Loads the acoustic model once per process and mints one recognizer per
/// session.
pub struct VoskEngineFactory {
    model: Model,
}

impl VoskEngineFactory {
    pub fn load(model_path: &Path) -> Result<Self> {
        if !model_path.is_dir() {
            return Err(PipelineError::Startup(format!(
                "model directory not found: {}",
                model_path.display()
            )));
        }

        info!("Loading speech model from {}", model_path.display());
        let model = Model::new(model_path.to_string_lossy()).ok_or_else(|| {
            PipelineError::Startup(format!(
                "failed to load model from {}",
                model_path.display()
            ))
        })?;

        Ok(Self { model })
    }
}

impl EngineFactory for VoskEngineFactory {
    fn new_engine(&self) -> Result<Box<dyn SpeechEngine>> {
        let mut recognizer =
            Recognizer::new(&self.model, SAMPLE_RATE as f32).ok_or_else(|| {
                PipelineError::Engine("failed to create recognizer".into())
            })?;
        recognizer.set_words(true);
        Ok(Box::new(VoskEngine { recognizer }))
    }

    fn name(&self) -> &str {
        "vosk"
    }
}

struct VoskEngine {
    recognizer: Recognizer,
}

impl SpeechEngine for VoskEngine {
    fn accept_frame(&mut self, samples: &[i16]) -> Result<Recognition> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| PipelineError::Engine(e.to_string()))?;

        match state {
            DecodingState::Finalized => {
                Ok(Recognition::Final(complete_text(self.recognizer.result())))
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.trim();
                Ok(Recognition::Partial(
                    (!partial.is_empty()).then(|| partial.to_string()),
                ))
            }
            DecodingState::Failed => {
                Err(PipelineError::Engine("waveform decoding failed".into()))
            }
        }
    }

    fn flush(&mut self) -> Result<Recognition> {
        Ok(Recognition::Final(complete_text(
            self.recognizer.final_result(),
        )))
    }

    fn reset(&mut self) {
        self.recognizer.reset();
    }
}

fn complete_text(result: CompleteResult) -> String {
    match result {
        CompleteResult::Single(single) => single.text.trim().to_string(),
        // max_alternatives is never raised, but don't lose text if it is.
        CompleteResult::Multiple(multiple) => multiple
            .alternatives
            .first()
            .map(|alt| alt.text.trim().to_string())
            .unwrap_or_default(),
    }
}
