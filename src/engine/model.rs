//! The Kokoro ONNX session and per-chunk inference.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::phonemizer::{self, Vocab};
use super::voicepack::{VoicepackStore, STYLE_DIM};
use super::KokoroError;
use crate::voice::Voice;

/// Maximum phoneme tokens the model accepts per run (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Output sample rate of the Kokoro model.
pub const SAMPLE_RATE: u32 = 24_000;

/// Crossfade length when joining audio from an internally split sequence.
const JOIN_CROSSFADE_SAMPLES: usize = 240; // 10ms @ 24kHz

/// Fixed speech speed; the CLI exposes no speed control.
const SPEED: f32 = 1.0;

pub struct KokoroModel {
    session: Session,
    voicepacks: VoicepackStore,
    vocab: Vocab,
    punct_ids: Vec<i64>,
    /// Detected token input name: "input_ids" or "tokens".
    tokens_input_name: String,
    /// True if the speed input expects int32, false for float32.
    speed_is_int32: bool,
}

impl KokoroModel {
    /// Load the model from a directory containing the `.onnx` file, the
    /// `voices-v1.0.bin` voicepack archive, and `config.json`.
    pub fn load(model_dir: &Path) -> Result<Self, KokoroError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(vec![CPUExecutionProvider::default().build()])?
            .with_parallel_execution(true)?
            .commit_from_file(&onnx_path)?;

        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);
        log::info!(
            "Detected: tokens_input='{tokens_input_name}', speed_is_int32={speed_is_int32}"
        );

        let voices_path = model_dir.join("voices-v1.0.bin");
        if !voices_path.exists() {
            return Err(KokoroError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "Voicepack archive not found at {}. Download it from the Kokoro model repository.",
                    voices_path.display()
                ),
            )));
        }
        let voicepacks = VoicepackStore::load(&voices_path)?;

        let config_path = model_dir.join("config.json");
        if !config_path.exists() {
            return Err(KokoroError::Config(format!(
                "config.json not found in {}",
                model_dir.display()
            )));
        }
        let vocab = Vocab::load(&config_path)?;
        let punct_ids = vocab.punctuation_ids();

        Ok(Self {
            session,
            voicepacks,
            vocab,
            punct_ids,
            tokens_input_name,
            speed_is_int32,
        })
    }

    /// Synthesize one chunk of text, or `None` when phonemization produces
    /// nothing to speak.
    pub fn synthesize(&mut self, text: &str, voice: Voice) -> Result<Option<Vec<f32>>, KokoroError> {
        let ids = phonemizer::phonemize(text, voice.language(), &self.vocab)?;
        if ids.is_empty() {
            log::debug!("No phoneme tokens produced for text: {text:?}");
            return Ok(None);
        }

        // One style index for the whole chunk, so an internal split does not
        // shift prosody between its halves.
        let style_idx = ids.len();
        let pieces = if ids.len() > MAX_PHONEME_LEN {
            log::debug!(
                "Phoneme sequence exceeded limit ({} > {MAX_PHONEME_LEN}), splitting",
                ids.len()
            );
            split_at_limit(&ids, &self.punct_ids)
        } else {
            vec![ids.clone()]
        };

        let mut combined = Vec::with_capacity(ids.len() * 300);
        for piece in &pieces {
            let style = self.voicepacks.style(voice, style_idx)?;
            let audio = self.run_inference(piece, &style)?;
            if audio.is_empty() {
                continue;
            }
            if combined.is_empty() {
                combined.extend_from_slice(&audio);
            } else {
                join_with_crossfade(&mut combined, &audio, JOIN_CROSSFADE_SAMPLES);
            }
        }

        if combined.is_empty() {
            return Ok(None);
        }
        Ok(Some(combined))
    }

    /// Run the session on one padded token sequence.
    fn run_inference(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
    ) -> Result<Vec<f32>, KokoroError> {
        let seq_len = tokens.len() + 2; // leading/trailing pad tokens

        let mut padded = vec![0i64; seq_len];
        padded[1..seq_len - 1].copy_from_slice(tokens);
        let tokens_arr = Array2::from_shape_vec((1, seq_len), padded)?;

        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let output = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[SPEED as i32]);
            let inputs = inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ];
            self.session.run(inputs)?
        } else {
            let speed_arr = ndarray::arr1(&[SPEED]);
            let inputs = inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ];
            self.session.run(inputs)?
        };

        let first_output = output
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("No output from model")))?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.as_slice().unwrap_or(&[]).to_vec())
    }
}

/// Find the ONNX model file in the given directory, preferring the
/// quantized build.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = model_dir.join("kokoro-quant-convinteger.onnx");
    if preferred.exists() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            log::info!("Using ONNX file: {}", path.display());
            return Ok(path);
        }
    }

    Err(KokoroError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("No .onnx file found in {}", model_dir.display()),
    )))
}

/// Detect the token input name ("input_ids" or "tokens") from the session.
fn detect_tokens_input(session: &Session) -> String {
    for input in &session.inputs {
        if input.name == "input_ids" || input.name == "tokens" {
            return input.name.clone();
        }
    }
    "input_ids".to_string()
}

/// Detect whether the speed input expects int32 (true) or float32 (false).
fn detect_speed_type(session: &Session) -> bool {
    for input in &session.inputs {
        if input.name == "speed" {
            let type_str = format!("{:?}", input.input_type);
            return type_str.contains("Int32") || type_str.contains("int32");
        }
    }
    // Modern Kokoro exports use int32.
    true
}

/// Split an over-long token sequence into pieces of at most
/// [`MAX_PHONEME_LEN`], cutting after punctuation where possible.
fn split_at_limit(ids: &[i64], punct_ids: &[i64]) -> Vec<Vec<i64>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < ids.len() {
        let end = (start + MAX_PHONEME_LEN).min(ids.len());
        if end == ids.len() {
            pieces.push(ids[start..end].to_vec());
            break;
        }

        let cut = ids[start..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, id)| punct_ids.contains(id))
            .map(|(i, _)| start + i + 1)
            .unwrap_or(end);

        pieces.push(ids[start..cut].to_vec());
        start = cut;
    }

    pieces
}

fn join_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    if overlap == 0 {
        dst.extend_from_slice(src);
        return;
    }

    let dst_start = dst.len() - overlap;
    for i in 0..overlap {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        dst[dst_start + i] = dst[dst_start + i] * (1.0 - t) + src[i] * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}

#[cfg(test)]
mod tests {
    use super::{join_with_crossfade, split_at_limit, MAX_PHONEME_LEN};

    #[test]
    fn short_sequences_are_one_piece() {
        let ids: Vec<i64> = (0..100).collect();
        let pieces = split_at_limit(&ids, &[4]);
        assert_eq!(pieces, vec![ids]);
    }

    #[test]
    fn long_sequences_split_after_punctuation() {
        // Tokens with a punctuation id (4) every 100 tokens.
        let mut ids = Vec::new();
        for i in 0..1200i64 {
            ids.push(if i % 100 == 99 { 4 } else { 50 });
        }
        let pieces = split_at_limit(&ids, &[4]);

        assert!(pieces.iter().all(|p| p.len() <= MAX_PHONEME_LEN));
        let total: usize = pieces.iter().map(Vec::len).sum();
        assert_eq!(total, ids.len());
        // Every piece except the last ends right after a punctuation token.
        for piece in &pieces[..pieces.len() - 1] {
            assert_eq!(*piece.last().unwrap(), 4);
        }
    }

    #[test]
    fn punctuation_free_sequences_split_hard() {
        let ids = vec![50i64; MAX_PHONEME_LEN + 10];
        let pieces = split_at_limit(&ids, &[4]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].len(), MAX_PHONEME_LEN);
        assert_eq!(pieces[1].len(), 10);
    }

    #[test]
    fn crossfade_preserves_total_length_minus_overlap() {
        let mut dst = vec![1.0f32; 100];
        let src = vec![0.0f32; 100];
        join_with_crossfade(&mut dst, &src, 10);
        assert_eq!(dst.len(), 190);
        // Samples before the overlap are untouched; inside it the blend
        // ramps from dst toward src.
        assert_eq!(dst[89], 1.0);
        assert!(dst[90] < 1.0 && dst[90] > 0.0);
        assert!(dst[99] < dst[90]);
    }

    #[test]
    fn crossfade_with_empty_destination_appends() {
        let mut dst: Vec<f32> = Vec::new();
        join_with_crossfade(&mut dst, &[0.5, 0.25], 10);
        assert_eq!(dst, vec![0.5, 0.25]);
    }
}
