//! Kokoro text-to-speech engine.
//!
//! The engine wraps the Kokoro ONNX model and everything it needs at run
//! time: an espeak-ng subprocess for phonemization, the voicepack archive
//! holding per-voice style vectors, and the IPA vocabulary from the model's
//! `config.json`.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: <https://espeak-ng.org/download>
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro/
//! ├── kokoro-quant-convinteger.onnx   # 8-bit quantized model, CPU-optimized
//! ├── voices-v1.0.bin                 # voicepack archive (.npz format)
//! └── config.json                     # IPA vocabulary
//! ```

mod model;
mod phonemizer;
mod voicepack;

use std::path::Path;

use crate::voice::Voice;
use crate::{SynthesisEngine, SynthesisResult};
use model::KokoroModel;

pub use model::SAMPLE_RATE;

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voicepack for '{0}' not present in the voice archive")]
    VoicepackMissing(&'static str),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voicepack archive: {0}")]
    VoicepackParse(String),
}

/// Kokoro text-to-speech engine.
///
/// Holds the ONNX session and voicepacks once loaded. Synthesis goes through
/// the [`SynthesisEngine`] trait.
pub struct KokoroEngine {
    model: Option<KokoroModel>,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    pub fn new() -> Self {
        Self { model: None }
    }

    /// Load the model, voicepacks, and vocabulary from a model directory.
    pub fn load_model(&mut self, model_dir: &Path) -> Result<(), KokoroError> {
        self.model = Some(KokoroModel::load(model_dir)?);
        Ok(())
    }

    /// Drop the loaded model and free its resources.
    pub fn unload_model(&mut self) {
        self.model = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }
}

impl SynthesisEngine for KokoroEngine {
    type Error = KokoroError;

    fn generate(
        &mut self,
        text: &str,
        voice: Voice,
    ) -> Result<Option<SynthesisResult>, KokoroError> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;
        Ok(model.synthesize(text, voice)?.map(|samples| SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        }))
    }
}
