//! Wake-phrase tables and the matchers built from them.
//!
//! The reference markers say "Whisper, Ok." and "Ok, Whisper.". Engines
//! render these differently per script, so each table lists the spellings
//! seen in practice. Entries are regex fragments matched case-insensitively.

use std::sync::LazyLock;

use regex::Regex;

pub struct PhraseTable {
    pub script: &'static str,
    pub wake: &'static [&'static str],
    pub ok: &'static [&'static str],
}

pub const PHRASE_TABLES: &[PhraseTable] = &[
    PhraseTable {
        script: "latin",
        wake: &["Whisper", "Wisper", "Wyspę", "Wysper", "Wispa"],
        ok: &["okay", "oké", "okej", "o[.]?k[.]?"],
    },
    PhraseTable {
        script: "cyrillic",
        wake: &["Уіспер"],
        ok: &["Окей", "окэй"],
    },
    PhraseTable {
        script: "greek",
        wake: &["Ου ίσπερ"],
        ok: &["οκέι"],
    },
    PhraseTable {
        script: "hangul",
        wake: &["위스퍼드"],
        ok: &[],
    },
    PhraseTable {
        script: "japanese",
        wake: &["ウィスパー"],
        ok: &["オーケー"],
    },
    PhraseTable {
        script: "devanagari",
        wake: &["विस्पर", "विसपर"],
        ok: &["ओके"],
    },
];

const SEPARATOR: &str = "[.,!? ]*";

/// Matchers over engine output for the marker protocol.
///
/// "Forward" is the `wake ok … ok wake` bracketing produced by the natural
/// marker order; "reversed" is `ok wake … wake ok`.
pub struct MarkerPatterns {
    only_markers: Regex,
    forward_bracketed: Regex,
    reversed_bracketed: Regex,
    forward_edges: Regex,
    reversed_edges: Regex,
}

static DEFAULT_PATTERNS: LazyLock<MarkerPatterns> =
    LazyLock::new(|| MarkerPatterns::from_tables(PHRASE_TABLES).expect("valid static regex"));

impl MarkerPatterns {
    pub fn standard() -> &'static MarkerPatterns {
        &DEFAULT_PATTERNS
    }

    pub fn from_tables(tables: &[PhraseTable]) -> Result<Self, regex::Error> {
        let wake = alternation(tables.iter().flat_map(|t| t.wake.iter()));
        let ok = alternation(tables.iter().flat_map(|t| t.ok.iter()));
        let s = SEPARATOR;

        let wake_ok = format!("{wake}{s}{ok}{s}");
        let ok_wake = format!("{ok}{s}{wake}{s}");

        Ok(Self {
            only_markers: Regex::new(&format!(
                r"(?i)^ *(?:{ok}|{s}|{wake})*{wake}(?:{ok}|{s}|{wake})* *$"
            ))?,
            forward_bracketed: Regex::new(&format!(r"(?is)^ *{wake_ok}.*\b{ok_wake} *$"))?,
            reversed_bracketed: Regex::new(&format!(r"(?is)^ *{ok_wake}.*\b{wake_ok} *$"))?,
            forward_edges: Regex::new(&format!(r"(?i)^ *{wake_ok}|\b{ok_wake} *$"))?,
            reversed_edges: Regex::new(&format!(r"(?i)^ *{ok_wake}|\b{wake_ok} *$"))?,
        })
    }

    /// True when `text` holds nothing but marker words and punctuation, with
    /// at least one wake word among them. A lone "ok" is ordinary speech.
    pub fn is_only_markers(&self, text: &str) -> bool {
        self.only_markers.is_match(text)
    }

    pub fn is_forward_bracketed(&self, text: &str) -> bool {
        self.forward_bracketed.is_match(text)
    }

    pub fn is_reversed_bracketed(&self, text: &str) -> bool {
        self.reversed_bracketed.is_match(text)
    }

    /// Remove the leading and trailing forward-order markers, then trim.
    pub fn strip_forward(&self, text: &str) -> String {
        self.forward_edges.replacen(text, 2, "").trim().to_string()
    }

    pub fn strip_reversed(&self, text: &str) -> String {
        self.reversed_edges.replacen(text, 2, "").trim().to_string()
    }
}

fn alternation<'a>(fragments: impl Iterator<Item = &'a &'static str>) -> String {
    let parts: Vec<&str> = fragments.copied().collect();
    format!("(?:{})", parts.join("|"))
}
