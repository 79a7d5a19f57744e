//! Text to phoneme token IDs, via espeak-ng.
//!
//! Punctuation carries prosody in Kokoro, but espeak-ng mostly swallows it,
//! so text is segmented into word runs and punctuation marks first. Word runs
//! go through espeak-ng in one batch; the marks are mapped to their own
//! token IDs straight from the vocabulary.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::KokoroError;
use crate::voice::Language;

/// Mapping from IPA characters (and punctuation) to model token IDs.
pub struct Vocab {
    map: HashMap<char, i64>,
}

#[derive(Deserialize)]
struct ModelConfig {
    vocab: HashMap<String, i64>,
}

impl Vocab {
    /// Load the vocabulary from the model's `config.json`.
    pub fn load(config_path: &Path) -> Result<Self, KokoroError> {
        let content = std::fs::read_to_string(config_path)?;
        Self::from_json(&content)
    }

    fn from_json(content: &str) -> Result<Self, KokoroError> {
        let config: ModelConfig = serde_json::from_str(content)
            .map_err(|e| KokoroError::Config(format!("failed to parse JSON: {e}")))?;

        let mut map = HashMap::new();
        for (key, id) in config.vocab {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(KokoroError::Config(format!(
                    "vocab key {key:?} is not a single character"
                )));
            };
            map.insert(ch, id);
        }

        Ok(Self { map })
    }

    pub fn id(&self, ch: char) -> Option<i64> {
        self.map.get(&ch).copied()
    }

    /// Token IDs of the sentence punctuation marks present in the vocab,
    /// used as preferred split points for over-long phoneme sequences.
    pub fn punctuation_ids(&self) -> Vec<i64> {
        ";:,.!?".chars().filter_map(|ch| self.id(ch)).collect()
    }
}

/// Convert one chunk of text to phoneme token IDs.
///
/// IPA characters missing from the vocab are silently dropped, matching the
/// Python reference. An empty result means the text had nothing to say.
pub fn phonemize(text: &str, lang: Language, vocab: &Vocab) -> Result<Vec<i64>, KokoroError> {
    let pieces = segment(text);
    if pieces.is_empty() {
        return Ok(Vec::new());
    }

    let word_runs: Vec<&str> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Words(words) => Some(words.as_str()),
            Piece::Mark(_) => None,
        })
        .collect();

    let run_ids = if word_runs.is_empty() {
        Vec::new()
    } else {
        ipa_for_runs(&word_runs, lang, vocab)?
    };

    let mut ids = Vec::new();
    let mut run_index = 0usize;
    for piece in pieces {
        match piece {
            Piece::Words(_) => {
                if let Some(run) = run_ids.get(run_index) {
                    ids.extend_from_slice(run);
                }
                run_index += 1;
            }
            Piece::Mark(mark) => {
                if let Some(id) = vocab.id(mark) {
                    ids.push(id);
                }
            }
        }
    }

    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Words(String),
    Mark(char),
}

/// Split text into word runs and prosody-bearing punctuation marks.
///
/// A `.` or `,` between two digits stays inside the word run so decimals and
/// thousands separators survive phonemization intact. Newlines count as
/// sentence ends.
fn segment(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        if let Some(mark) = prosody_mark(ch) {
            if !joins_digits(text, idx, ch) {
                flush(&mut pieces, &mut current);
                pieces.push(Piece::Mark(mark));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
            continue;
        }

        current.push(ch);
    }

    flush(&mut pieces, &mut current);
    pieces
}

fn flush(pieces: &mut Vec<Piece>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        pieces.push(Piece::Words(trimmed.to_string()));
    }
    current.clear();
}

fn prosody_mark(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn joins_digits(text: &str, idx: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }
    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch.len_utf8()..].chars().next();
    matches!(
        (prev, next),
        (Some(p), Some(n)) if p.is_ascii_digit() && n.is_ascii_digit()
    )
}

/// Phonemize all word runs in one espeak-ng invocation (newline-separated),
/// falling back to one invocation per run if the output line count does not
/// line up with the input.
fn ipa_for_runs(
    runs: &[&str],
    lang: Language,
    vocab: &Vocab,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let batched = runs.join("\n");
    let output = run_espeak(&batched, lang)?;
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() != runs.len() {
        return runs
            .iter()
            .map(|run| Ok(ipa_to_ids(&run_espeak(run, lang)?, vocab)))
            .collect();
    }

    Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect())
}

fn run_espeak(input: &str, lang: Language) -> Result<String, KokoroError> {
    let mut child = Command::new("espeak-ng")
        .args(["--ipa", "--stdin", "-q", "-v", lang.espeak_voice()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KokoroError::EspeakNotFound
            } else {
                KokoroError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // espeak-ng reads stdin line by line; without a final newline the
        // last token can come out truncated.
        stdin.write_all(input.as_bytes()).map_err(KokoroError::Io)?;
        if !input.ends_with('\n') {
            stdin.write_all(b"\n").map_err(KokoroError::Io)?;
        }
    }

    let output = child.wait_with_output().map_err(KokoroError::Io)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {stderr}",
            output.status.code()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ipa_to_ids(ipa: &str, vocab: &Vocab) -> Vec<i64> {
    let mut ids = Vec::new();
    for line in ipa.lines() {
        for ch in line.trim().chars() {
            // espeak-ng marks word-internal boundaries with underscores.
            if ch == '_' {
                continue;
            }
            if let Some(id) = vocab.id(ch) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::{segment, Piece, Vocab};

    fn vocab() -> Vocab {
        Vocab::from_json(r#"{"vocab": {";": 1, ":": 2, ",": 3, ".": 4, "!": 5, "?": 6, "a": 43, "b": 44}}"#)
            .expect("valid vocab json")
    }

    #[test]
    fn segments_words_and_marks() {
        let pieces = segment("Hello, world. Testing!");
        assert_eq!(
            pieces,
            vec![
                Piece::Words("Hello".to_string()),
                Piece::Mark(','),
                Piece::Words("world".to_string()),
                Piece::Mark('.'),
                Piece::Words("Testing".to_string()),
                Piece::Mark('!'),
            ]
        );
    }

    #[test]
    fn keeps_numeric_separators_inside_word_runs() {
        let pieces = segment("Version 2.0 reached 1,000 users.");
        assert_eq!(
            pieces,
            vec![
                Piece::Words("Version 2.0 reached 1,000 users".to_string()),
                Piece::Mark('.'),
            ]
        );
    }

    #[test]
    fn splits_comma_that_does_not_join_digits() {
        let pieces = segment("Value 2, next");
        assert_eq!(
            pieces,
            vec![
                Piece::Words("Value 2".to_string()),
                Piece::Mark(','),
                Piece::Words("next".to_string()),
            ]
        );
    }

    #[test]
    fn newlines_become_sentence_ends() {
        let pieces = segment("one\ntwo");
        assert_eq!(
            pieces,
            vec![
                Piece::Words("one".to_string()),
                Piece::Mark('.'),
                Piece::Words("two".to_string()),
            ]
        );
    }

    #[test]
    fn vocab_parses_config_json() {
        let vocab = vocab();
        assert_eq!(vocab.id('a'), Some(43));
        assert_eq!(vocab.id('.'), Some(4));
        assert_eq!(vocab.id('z'), None);
    }

    #[test]
    fn punctuation_ids_cover_the_marks_in_the_vocab() {
        let mut ids = vocab().punctuation_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn multi_character_vocab_keys_are_rejected() {
        let result = Vocab::from_json(r#"{"vocab": {"ab": 1}}"#);
        assert!(result.is_err());
    }
}
