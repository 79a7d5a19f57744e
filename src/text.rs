//! Text cleanup and chunking ahead of synthesis.
//!
//! The model copes badly with typographic quotes, CJK punctuation, stray
//! control characters, and spelled-out titles, so input text is normalized
//! before it is split into sentence- or line-sized chunks.

use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Chunks shorter than this (in characters) are never sent to synthesis.
pub const MIN_CHUNK_CHARS: usize = 2;

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"  +").expect("valid regex"));
static DR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bD[Rr]\.").expect("valid regex"));
static MR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bM[Rr]\.").expect("valid regex"));
static MS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bM[Ss]\.").expect("valid regex"));

/// How the cleaned text is split into synthesis chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    /// Split on `.`, trimming each piece and dropping empty ones.
    Sentences,
    /// One chunk per line, used for markdown input.
    Lines,
}

/// Normalize raw text into a form the speech model handles well.
///
/// Pure and total: any input is accepted, including empty, and applying the
/// function twice yields the same result as applying it once.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = normalize_punctuation(text);
    cleaned = MULTI_SPACE_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = strip_space_only_lines(&cleaned);
    // Title expansion keeps the original tool's case asymmetry: `Mr.`/`Ms.`
    // expand unconditionally, while `Dr.`, `MR.`, and `MS.` expand only
    // before a capitalized word. Both case forms of a title go through one
    // pass so a replacement cannot eat the next match's word boundary.
    cleaned = expand_title(&cleaned, &DR_RE, "Doctor", |_| true);
    cleaned = expand_title(&cleaned, &MR_RE, "Mister", |m| m == "MR.");
    cleaned = expand_title(&cleaned, &MS_RE, "Miss", |m| m == "MS.");
    cleaned.replace("```", "")
}

/// Split cleaned text into ordered, synthesis-ready chunks.
pub fn chunk_text(text: &str, mode: ChunkMode) -> Vec<String> {
    match mode {
        ChunkMode::Lines => text.lines().map(str::to_string).collect(),
        ChunkMode::Sentences => text
            .split('.')
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Whether a chunk is long enough to be worth synthesizing.
pub fn is_synthesizable(chunk: &str) -> bool {
    chunk.chars().count() >= MIN_CHUNK_CHARS
}

/// Interpret the CLI text argument: an existing path is read as a file (a
/// `.md` extension selects line chunking), anything else is literal text —
/// a nonexistent path is spoken, not reported as a read error.
pub fn load_input(text_arg: &str) -> io::Result<(String, ChunkMode)> {
    let path = Path::new(text_arg);
    if !path.exists() {
        return Ok((text_arg.to_string(), ChunkMode::Sentences));
    }

    let contents = std::fs::read_to_string(path)?;
    let mode = if path.extension().and_then(|e| e.to_str()) == Some("md") {
        ChunkMode::Lines
    } else {
        ChunkMode::Sentences
    };
    Ok((contents, mode))
}

/// Quote canonicalization, CJK punctuation conversion, and whitespace
/// classing, in one character pass.
fn normalize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '«' | '»' | '\u{201c}' | '\u{201d}' => out.push('"'),
            '、' | '，' => out.push_str(", "),
            '。' => out.push_str(". "),
            '！' => out.push_str("! "),
            '：' => out.push_str(": "),
            '；' => out.push_str("; "),
            '？' => out.push_str("? "),
            c if c.is_whitespace() && c != ' ' && c != '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Delete runs of spaces that sit between two newlines, turning
/// whitespace-only lines into empty ones. Space runs at the very start or
/// end of the text have no flanking newlines and are left alone.
fn strip_space_only_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut after_newline = false;

    while let Some((idx, ch)) = chars.next() {
        if ch == ' ' && after_newline {
            let mut end = idx + 1;
            while let Some(&(_, next)) = chars.peek() {
                if next != ' ' {
                    break;
                }
                chars.next();
                end += 1;
            }
            if text[end..].starts_with('\n') {
                // Drop the run; the trailing newline is handled next iteration.
                after_newline = false;
                continue;
            }
            out.push_str(&text[idx..end]);
            after_newline = false;
            continue;
        }

        out.push(ch);
        after_newline = ch == '\n';
    }

    out
}

/// Replace title abbreviations matched by `re` with `replacement`.
///
/// Matches for which `gated` returns true are only replaced when followed by
/// a space and an ASCII uppercase letter (the heuristic that avoids expanding
/// mid-sentence false positives).
fn expand_title(text: &str, re: &Regex, replacement: &str, gated: fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        if gated(m.as_str()) && !followed_by_capital(&text[m.end()..]) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(replacement);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

fn followed_by_capital(tail: &str) -> bool {
    let mut chars = tail.chars();
    chars.next() == Some(' ') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}
