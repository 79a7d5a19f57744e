//! The static Kokoro voice catalog and voice-name resolution.
//!
//! Voice identifiers follow the pattern `{lang}{gender}_{name}` (or just
//! `{lang}{gender}` for the neutral voice), where the first character selects
//! the phonemization language. The catalog is fixed at compile time, so it is
//! expressed as an enum rather than a free-form string.

use std::fmt;

use strsim::jaro_winkler;

/// Minimum similarity for a fuzzy match to be accepted.
const FUZZY_CUTOFF: f64 = 0.6;

/// Phonemization language, encoded in the first character of a voice id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// `a` — US English.
    AmericanEnglish,
    /// `b` — British English.
    BritishEnglish,
}

impl Language {
    /// The single-character tag used in voice identifiers.
    pub fn code(self) -> char {
        match self {
            Language::AmericanEnglish => 'a',
            Language::BritishEnglish => 'b',
        }
    }

    /// The espeak-ng voice name used for phonemization.
    pub fn espeak_voice(self) -> &'static str {
        match self {
            Language::AmericanEnglish => "en-us",
            Language::BritishEnglish => "en-gb",
        }
    }
}

/// One of the eleven voices shipped with the Kokoro voicepack archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voice {
    Af,
    AfBella,
    AfSarah,
    AmAdam,
    AmMichael,
    BfEmma,
    BfIsabella,
    BmGeorge,
    BmLewis,
    AfNicole,
    AfSky,
}

impl Voice {
    /// Every voice, in catalog order. Listing and suffix resolution iterate
    /// in this order, so it must stay stable.
    pub const ALL: [Voice; 11] = [
        Voice::Af,
        Voice::AfBella,
        Voice::AfSarah,
        Voice::AmAdam,
        Voice::AmMichael,
        Voice::BfEmma,
        Voice::BfIsabella,
        Voice::BmGeorge,
        Voice::BmLewis,
        Voice::AfNicole,
        Voice::AfSky,
    ];

    /// The identifier used in voicepack files and output file names.
    pub fn id(self) -> &'static str {
        match self {
            Voice::Af => "af",
            Voice::AfBella => "af_bella",
            Voice::AfSarah => "af_sarah",
            Voice::AmAdam => "am_adam",
            Voice::AmMichael => "am_michael",
            Voice::BfEmma => "bf_emma",
            Voice::BfIsabella => "bf_isabella",
            Voice::BmGeorge => "bm_george",
            Voice::BmLewis => "bm_lewis",
            Voice::AfNicole => "af_nicole",
            Voice::AfSky => "af_sky",
        }
    }

    /// Human-readable description shown by `--voices`.
    pub fn description(self) -> &'static str {
        match self {
            Voice::Af => "Adult Female (Neutral)",
            Voice::AfBella => "Adult Female - Bella (Warm)",
            Voice::AfSarah => "Adult Female - Sarah (Professional)",
            Voice::AmAdam => "Adult Male - Adam (Friendly)",
            Voice::AmMichael => "Adult Male - Michael (Deep)",
            Voice::BfEmma => "British Female - Emma (Proper)",
            Voice::BfIsabella => "British Female - Isabella (Soft)",
            Voice::BmGeorge => "British Male - George (Formal)",
            Voice::BmLewis => "British Male - Lewis (Casual)",
            Voice::AfNicole => "Adult Female - Nicole (Whisper)",
            Voice::AfSky => "Adult Female - Sky (Bright)",
        }
    }

    /// The phonemization language, taken from the identifier's first character.
    pub fn language(self) -> Language {
        match self.id().as_bytes()[0] {
            b'a' => Language::AmericanEnglish,
            _ => Language::BritishEnglish,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Resolve a user-supplied voice query against the catalog.
///
/// Matching is tried in priority order: exact identifier, then suffix (so
/// `sky` finds `af_sky` without its language/gender prefix), then fuzzy
/// similarity with a cutoff. Returns `None` when nothing clears the cutoff.
pub fn resolve(query: &str) -> Option<Voice> {
    if let Some(exact) = Voice::ALL.iter().find(|v| v.id() == query) {
        return Some(*exact);
    }

    if let Some(suffix) = Voice::ALL.iter().find(|v| v.id().ends_with(query)) {
        return Some(*suffix);
    }

    let mut best: Option<(Voice, f64)> = None;
    for voice in Voice::ALL {
        let score = jaro_winkler(query, voice.id());
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((voice, score));
        }
    }
    best.filter(|&(_, score)| score >= FUZZY_CUTOFF)
        .map(|(voice, _)| voice)
}

#[cfg(test)]
mod tests {
    use super::{resolve, Language, Voice};

    #[test]
    fn catalog_has_eleven_voices() {
        assert_eq!(Voice::ALL.len(), 11);
    }

    #[test]
    fn exact_queries_resolve_to_themselves() {
        for voice in Voice::ALL {
            assert_eq!(resolve(voice.id()), Some(voice));
        }
    }

    #[test]
    fn prefix_stripped_queries_resolve_via_suffix() {
        assert_eq!(resolve("sky"), Some(Voice::AfSky));
        assert_eq!(resolve("bella"), Some(Voice::AfBella));
        assert_eq!(resolve("george"), Some(Voice::BmGeorge));
        assert_eq!(resolve("michael"), Some(Voice::AmMichael));
    }

    #[test]
    fn every_identifier_resolves_without_its_prefix() {
        for voice in Voice::ALL {
            let stripped = voice.id().trim_start_matches(|c| c != '_');
            let stripped = stripped.strip_prefix('_').unwrap_or(voice.id());
            assert_eq!(resolve(stripped), Some(voice), "query {stripped:?}");
        }
    }

    #[test]
    fn misspelling_resolves_fuzzily() {
        assert_eq!(resolve("bela"), Some(Voice::AfBella));
        assert_eq!(resolve("af_belle"), Some(Voice::AfBella));
    }

    #[test]
    fn distant_query_is_not_found() {
        assert_eq!(resolve("zzzz"), None);
        assert_eq!(resolve("qqqq"), None);
    }

    #[test]
    fn borderline_name_queries_stay_not_found() {
        // Plausible names that share letters with catalog entries but sit
        // below the similarity cutoff; pinned so the cutoff cannot silently
        // loosen.
        assert_eq!(resolve("mike"), None);
        assert_eq!(resolve("jones"), None);
    }

    #[test]
    fn languages_follow_the_identifier_prefix() {
        assert_eq!(Voice::AfSky.language(), Language::AmericanEnglish);
        assert_eq!(Voice::BmLewis.language(), Language::BritishEnglish);
        for voice in Voice::ALL {
            assert_eq!(voice.id().chars().next(), Some(voice.language().code()));
        }
    }

    #[test]
    fn espeak_voice_names() {
        assert_eq!(Language::AmericanEnglish.espeak_voice(), "en-us");
        assert_eq!(Language::BritishEnglish.espeak_voice(), "en-gb");
    }
}
