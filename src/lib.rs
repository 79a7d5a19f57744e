//! # kokoro-say
//!
//! Command-line text-to-speech built on the Kokoro engine.
//!
//! The library half of the crate holds everything the `kokoro-say` binary
//! orchestrates: the fixed voice catalog and its resolver, text cleanup and
//! chunking, the Kokoro synthesis engine, audio-file encoding, and playback.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::Path;
//! use kokoro_say::{engine::KokoroEngine, voice::Voice, SynthesisEngine};
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(Path::new("models/kokoro"))?;
//!
//! if let Some(result) = engine.generate("Hello, world!", Voice::AfSky)? {
//!     result.write_wav(Path::new("output.wav"))?;
//! }
//! # Ok::<(), kokoro_say::engine::KokoroError>(())
//! ```

pub mod engine;
pub mod output;
pub mod playback;
pub mod text;
pub mod voice;

use std::path::Path;

use voice::Voice;

/// The result of synthesizing one piece of text.
///
/// Contains raw f32 audio samples in `[-1, 1]` and the sample rate of the
/// output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for Kokoro)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// The synthesis contract the CLI drives.
///
/// `generate` returns `Ok(None)` when the engine could not produce audio for
/// the given text (for example, when phonemization yields nothing); the
/// caller treats that as a skippable failure rather than a hard error.
pub trait SynthesisEngine {
    type Error: std::error::Error;

    /// Synthesize speech for one chunk of text with the given voice.
    fn generate(&mut self, text: &str, voice: Voice)
        -> Result<Option<SynthesisResult>, Self::Error>;
}

/// Synthesize a sequence of chunks and concatenate the audio in chunk order.
///
/// Chunks shorter than [`text::MIN_CHUNK_CHARS`] are skipped outright. A
/// chunk whose synthesis fails or yields nothing is skipped with a warning;
/// the returned buffer is empty only if every chunk was skipped.
pub fn synthesize_chunks<E: SynthesisEngine>(
    engine: &mut E,
    chunks: &[String],
    voice: Voice,
) -> Vec<f32> {
    let mut samples = Vec::new();
    for chunk in chunks {
        if !text::is_synthesizable(chunk) {
            continue;
        }
        match engine.generate(chunk, voice) {
            Ok(Some(result)) => samples.extend(result.samples),
            Ok(None) => log::warn!("Could not generate audio for text: {chunk}"),
            Err(err) => log::warn!("Synthesis failed for {chunk:?}: {err}"),
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::{synthesize_chunks, SynthesisEngine, SynthesisResult};
    use crate::voice::Voice;

    /// Engine stand-in that emits one recognizable sample per call and can
    /// fail on demand.
    struct FakeEngine {
        next_sample: f32,
        fail_on: Vec<String>,
        none_on: Vec<String>,
        calls: Vec<String>,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                next_sample: 0.0,
                fail_on: Vec::new(),
                none_on: Vec::new(),
                calls: Vec::new(),
            }
        }
    }

    impl SynthesisEngine for FakeEngine {
        type Error = std::io::Error;

        fn generate(
            &mut self,
            text: &str,
            _voice: Voice,
        ) -> Result<Option<SynthesisResult>, Self::Error> {
            self.calls.push(text.to_string());
            if self.fail_on.iter().any(|t| t == text) {
                return Err(std::io::Error::other("synthetic failure"));
            }
            if self.none_on.iter().any(|t| t == text) {
                return Ok(None);
            }
            self.next_sample += 1.0;
            Ok(Some(SynthesisResult {
                samples: vec![self.next_sample],
                sample_rate: 24_000,
            }))
        }
    }

    fn chunks(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn audio_order_matches_chunk_order() {
        let mut engine = FakeEngine::new();
        let samples =
            synthesize_chunks(&mut engine, &chunks(&["one", "two", "three"]), Voice::AfSky);
        assert_eq!(samples, vec![1.0, 2.0, 3.0]);
        assert_eq!(engine.calls, vec!["one", "two", "three"]);
    }

    #[test]
    fn short_chunks_are_never_sent_to_synthesis() {
        let mut engine = FakeEngine::new();
        let samples = synthesize_chunks(&mut engine, &chunks(&["a", "", "hello"]), Voice::Af);
        assert_eq!(samples, vec![1.0]);
        assert_eq!(engine.calls, vec!["hello"]);
    }

    #[test]
    fn failed_chunks_are_skipped_and_the_rest_continue() {
        let mut engine = FakeEngine::new();
        engine.fail_on.push("bad".to_string());
        engine.none_on.push("empty".to_string());
        let samples = synthesize_chunks(
            &mut engine,
            &chunks(&["ok", "bad", "empty", "fine"]),
            Voice::Af,
        );
        assert_eq!(samples, vec![1.0, 2.0]);
        assert_eq!(engine.calls, vec!["ok", "bad", "empty", "fine"]);
    }

    #[test]
    fn total_failure_yields_an_empty_buffer() {
        let mut engine = FakeEngine::new();
        engine.fail_on = vec!["x1".to_string(), "x2".to_string()];
        let samples = synthesize_chunks(&mut engine, &chunks(&["x1", "x2"]), Voice::Af);
        assert!(samples.is_empty());
    }

    #[test]
    fn duration_reflects_sample_count() {
        let result = SynthesisResult {
            samples: vec![0.0; 48_000],
            sample_rate: 24_000,
        };
        assert_eq!(result.duration_secs(), 2.0);
    }

    #[test]
    fn write_wav_round_trips_samples() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.wav");
        let result = SynthesisResult {
            samples: vec![0.0, 0.5, -0.5, 1.0],
            sample_rate: 24_000,
        };
        result.write_wav(&path).expect("write wav");

        let mut reader = hound::WavReader::open(&path).expect("open wav");
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, result.samples);
    }
}
