//! Audio-file encoding and output naming.
//!
//! WAV is written directly with `hound`. The lossy containers (opus, m4a,
//! mp3) go through an intermediate WAV handed to an `ffmpeg` subprocess with
//! voice-tuned encoder settings.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;

use crate::voice::Voice;

#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
    #[error(
        "ffmpeg not found. Compressed formats need ffmpeg on PATH: \
         Linux: `sudo apt-get install ffmpeg`, macOS: `brew install ffmpeg`"
    )]
    FfmpegNotFound,
    #[error("ffmpeg failed for {path}: {detail}")]
    Encoder { path: PathBuf, detail: String },
}

/// Output container for the synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Wav,
    Opus,
    M4a,
    Mp3,
}

impl OutputFormat {
    /// The file extension for this container.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Opus => "opus",
            OutputFormat::M4a => "m4a",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

/// The output file path for one run: `{dir}/{voice}-{timestamp}.{ext}`.
pub fn output_file(dir: &Path, voice: Voice, timestamp: u64, format: OutputFormat) -> PathBuf {
    dir.join(format!("{voice}-{timestamp}.{}", format.extension()))
}

/// Sibling transcript path written by `--debug`.
pub fn transcript_file(dir: &Path, voice: Voice, timestamp: u64) -> PathBuf {
    dir.join(format!("{voice}-{timestamp}.txt"))
}

/// Seconds since the Unix epoch, used to stamp output file names.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Encode `samples` into `path` in the requested container.
///
/// Samples are clamped to `[-1, 1]` first. WAV is written in place; the
/// lossy formats are transcoded from a temporary WAV by ffmpeg.
pub fn save_audio(
    samples: &[f32],
    path: &Path,
    format: OutputFormat,
    sample_rate: u32,
) -> Result<(), OutputError> {
    let clamped: Vec<f32> = samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect();

    if format == OutputFormat::Wav {
        return write_wav(&clamped, path, sample_rate);
    }

    let temp = tempfile::Builder::new()
        .prefix("kokoro-say-")
        .suffix(".wav")
        .tempfile()?;
    write_wav(&clamped, temp.path(), sample_rate)?;
    transcode(temp.path(), path, format)
}

fn write_wav(samples: &[f32], path: &Path, sample_rate: u32) -> Result<(), OutputError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Run ffmpeg to convert the intermediate WAV into the target container.
fn transcode(wav_path: &Path, out_path: &Path, format: OutputFormat) -> Result<(), OutputError> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-y"]);
    cmd.arg("-i").arg(wav_path);

    match format {
        // Opus with the speech-oriented application profile.
        OutputFormat::Opus => {
            cmd.args(["-c:a", "libopus", "-application", "voip", "-f", "opus"]);
        }
        // AAC in an mp4 container at a high quality setting.
        OutputFormat::M4a => {
            cmd.args(["-q:a", "2", "-f", "ipod"]);
        }
        // MP3 at the best VBR quality.
        OutputFormat::Mp3 => {
            cmd.args(["-q:a", "0", "-compression_level", "0", "-f", "mp3"]);
        }
        OutputFormat::Wav => unreachable!("wav is written without ffmpeg"),
    }

    cmd.arg(out_path);

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OutputError::FfmpegNotFound
        } else {
            OutputError::Io(e)
        }
    })?;

    if !output.status.success() {
        return Err(OutputError::Encoder {
            path: out_path.to_path_buf(),
            detail: format!(
                "exit code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(())
}
