//! Text Module
//!
//! Canonicalization of OCR text and the similarity primitives used by quote
//! verification. Everything here is pure and never fails.

mod normalize;
mod similarity;

pub use normalize::{aggressive_fold, canonicalize, word_count};
pub use similarity::{
    find_fuzzy_match, levenshtein, similarity_score, FuzzyMatch, FOLDED_MATCH_SCORE,
    MIN_FUZZY_NEEDLE_CHARS, MIN_WINDOW_CHARS,
};
