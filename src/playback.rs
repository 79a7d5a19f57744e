//! Playback of the final audio buffer through the default output device.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("no audio output device available: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("playback failed: {0}")]
    Play(#[from] rodio::PlayError),
}

/// Play a mono sample buffer and block until it finishes.
pub fn play_blocking(samples: Vec<f32>, sample_rate: u32) -> Result<(), PlaybackError> {
    let (_stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.append(SamplesBuffer::new(1, sample_rate, samples));
    sink.sleep_until_end();
    Ok(())
}
