//! Text canonicalization for OCR output
//!
//! Two forms are derived from raw page text:
//!
//! - the *canonical* form, still human readable, used for near-exact matching
//! - the *aggressive* fold, lowercase and punctuation-free, used only when
//!   scoring fuzzy similarity
//!
//! The aggressive fold is always computed from the canonical form.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Zero-width and invisible code points removed before anything else
const INVISIBLE: &[char] = &[
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
    '\u{00AD}', // soft hyphen
    '\u{180E}', // mongolian vowel separator
];

/// Typographic ligatures and their letter expansions
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
    ('\u{00C6}', "AE"),
    ('\u{00E6}', "ae"),
    ('\u{0152}', "OE"),
    ('\u{0153}', "oe"),
    ('\u{A732}', "AA"),
    ('\u{A733}', "aa"),
];

const DOUBLE_QUOTES: &[char] = &[
    '\u{201C}', // “
    '\u{201D}', // ”
    '\u{201E}', // „
    '\u{201F}', // ‟
    '\u{00AB}', // «
    '\u{00BB}', // »
];

const SINGLE_QUOTES: &[char] = &[
    '\u{2018}', // ‘
    '\u{2019}', // ’
    '\u{201A}', // ‚
    '\u{201B}', // ‛
    '\u{2039}', // ‹
    '\u{203A}', // ›
];

const DASHES: &[char] = &[
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash
    '\u{2013}', // en dash
    '\u{2014}', // em dash
    '\u{2015}', // horizontal bar
    '\u{2212}', // minus sign
    '\u{FE58}', // small em dash
    '\u{FE63}', // small hyphen-minus
    '\u{FF0D}', // fullwidth hyphen-minus
];

/// A hyphen at the end of a line, the line break, and the indentation after it
static LINE_BREAK_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[ \t]*\r?\n\s*").expect("valid hyphenation pattern"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Convert raw OCR text into its canonical form.
///
/// The function is idempotent: `canonicalize(&canonicalize(s)) == canonicalize(s)`.
pub fn canonicalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut folded = String::with_capacity(raw.len());
    for c in raw.chars() {
        if INVISIBLE.contains(&c) {
            continue;
        }
        if let Some((_, expansion)) = LIGATURES.iter().find(|(lig, _)| *lig == c) {
            folded.push_str(expansion);
        } else if DOUBLE_QUOTES.contains(&c) {
            folded.push('"');
        } else if SINGLE_QUOTES.contains(&c) {
            folded.push('\'');
        } else if DASHES.contains(&c) {
            folded.push('-');
        } else {
            folded.push(c);
        }
    }

    let joined = LINE_BREAK_HYPHEN.replace_all(&folded, "");
    let collapsed = WHITESPACE_RUN.replace_all(&joined, " ");

    collapsed.trim().nfc().collect()
}

/// Fold text for similarity scoring: canonical form, lowercased, with every
/// character other than word characters, whitespace and `-` removed.
pub fn aggressive_fold(raw: &str) -> String {
    let lowered = canonicalize(raw).to_lowercase();

    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Count whitespace-separated words in text
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
