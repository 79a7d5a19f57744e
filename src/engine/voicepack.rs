//! Voicepack loading.
//!
//! The voice archive (`voices-v1.0.bin`) is an npz file with one npy entry
//! per voice. Each entry is a 2D float32 array of style vectors; the row
//! index corresponds to the phoneme token count of the text being spoken.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::KokoroError;
use crate::voice::Voice;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Style vectors for every catalog voice found in the archive.
pub struct VoicepackStore {
    packs: HashMap<Voice, Vec<[f32; STYLE_DIM]>>,
}

impl VoicepackStore {
    /// Load the archive, keeping only entries that name a catalog voice.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| KokoroError::VoicepackParse(format!("not a zip archive: {e}")))?;

        let mut packs = HashMap::new();

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| KokoroError::VoicepackParse(format!("bad zip entry {i}: {e}")))?;

            let entry_name = entry.name().to_string();
            if entry_name.ends_with('/') {
                continue;
            }
            let voice_id = entry_name.trim_end_matches(".npy");

            let Some(voice) = Voice::ALL.iter().find(|v| v.id() == voice_id).copied() else {
                log::debug!("Skipping non-catalog voicepack entry '{entry_name}'");
                continue;
            };

            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(|e| {
                KokoroError::VoicepackParse(format!("failed to read {entry_name}: {e}"))
            })?;

            packs.insert(voice, parse_style_vectors(&data, &entry_name)?);
        }

        log::info!("Loaded {} voicepacks", packs.len());
        Ok(Self { packs })
    }

    /// The style vector for `voice` at the given index, clamped into range.
    pub fn style(&self, voice: Voice, idx: usize) -> Result<[f32; STYLE_DIM], KokoroError> {
        let styles = self
            .packs
            .get(&voice)
            .ok_or(KokoroError::VoicepackMissing(voice.id()))?;
        let clamped = idx.min(styles.len().saturating_sub(1));
        Ok(styles[clamped])
    }
}

/// Parse one npy entry into style vectors.
///
/// Expects little-endian float32 data whose length is a multiple of
/// [`STYLE_DIM`]. The header's shape declaration is not trusted beyond its
/// length; the float payload itself is what gets validated.
fn parse_style_vectors(data: &[u8], name: &str) -> Result<Vec<[f32; STYLE_DIM]>, KokoroError> {
    if data.len() < 12 {
        return Err(KokoroError::VoicepackParse(format!(
            "{name}: entry too short ({} bytes)",
            data.len()
        )));
    }
    if &data[0..6] != b"\x93NUMPY" {
        return Err(KokoroError::VoicepackParse(format!(
            "{name}: missing numpy magic bytes"
        )));
    }

    // Version 1 uses a 2-byte header length, versions 2 and 3 a 4-byte one.
    let (header_len, header_offset) = match data[6] {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 | 3 => (
            u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
            12,
        ),
        other => {
            return Err(KokoroError::VoicepackParse(format!(
                "{name}: unsupported npy version {other}"
            )))
        }
    };

    let data_offset = header_offset + header_len;
    if data.len() < data_offset {
        return Err(KokoroError::VoicepackParse(format!(
            "{name}: header truncated (need {data_offset} bytes, got {})",
            data.len()
        )));
    }

    let floats = &data[data_offset..];
    if floats.len() % 4 != 0 {
        return Err(KokoroError::VoicepackParse(format!(
            "{name}: payload length {} is not a multiple of 4",
            floats.len()
        )));
    }
    let n_floats = floats.len() / 4;
    if n_floats % STYLE_DIM != 0 {
        return Err(KokoroError::VoicepackParse(format!(
            "{name}: float count {n_floats} is not a multiple of {STYLE_DIM}"
        )));
    }

    let mut vectors = Vec::with_capacity(n_floats / STYLE_DIM);
    for row in floats.chunks_exact(STYLE_DIM * 4) {
        let mut vector = [0f32; STYLE_DIM];
        for (slot, bytes) in vector.iter_mut().zip(row.chunks_exact(4)) {
            *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        vectors.push(vector);
    }

    Ok(vectors)
}
