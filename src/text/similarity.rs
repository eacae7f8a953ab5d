//! Edit-distance similarity and sliding-window fuzzy search
//!
//! This is the hot loop of quote verification. The cost of
//! [`find_fuzzy_match`] grows with haystack length times needle length
//! squared, so callers must bound both inputs before calling it.

use serde::Serialize;

use super::normalize::aggressive_fold;

/// Needles shorter than this are never fuzzy matched
pub const MIN_FUZZY_NEEDLE_CHARS: usize = 20;

/// Candidate windows shorter than this are skipped
pub const MIN_WINDOW_CHARS: usize = 10;

/// Score given to strings that differ only in case or punctuation
pub const FOLDED_MATCH_SCORE: f64 = 0.98;

/// Window size offsets tried around the needle length, in order
const WINDOW_OFFSETS: [isize; 5] = [0, -1, 1, -2, 2];

/// Best fuzzy match found in a haystack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    /// Similarity of the matched window to the needle
    pub score: f64,
    /// The matched window text
    pub matched: String,
    /// Offset of the window in the haystack, in chars
    pub position: usize,
}

/// Levenshtein distance over chars, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein_chars(&a, &b)
}

fn levenshtein_chars(a: &[char], b: &[char]) -> usize {
    // Keep the shorter sequence as the row so memory is O(min(n, m))
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(lc != sc);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Similarity of two strings in `[0, 1]`.
///
/// Identical strings score 1.0, strings equal after aggressive folding score
/// [`FOLDED_MATCH_SCORE`], anything else scores by normalized edit distance of
/// the folded forms.
pub fn similarity_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let folded_a: Vec<char> = aggressive_fold(a).chars().collect();
    score_folded(&folded_a, b)
}

/// Score `candidate` against an already folded needle
fn score_folded(folded_needle: &[char], candidate: &str) -> f64 {
    let folded_candidate: Vec<char> = aggressive_fold(candidate).chars().collect();
    if folded_needle == folded_candidate.as_slice() {
        return FOLDED_MATCH_SCORE;
    }

    let max_len = folded_needle.len().max(folded_candidate.len());
    if max_len == 0 {
        return 0.0;
    }

    let distance = levenshtein_chars(folded_needle, &folded_candidate);
    1.0 - distance as f64 / max_len as f64
}

/// Search `haystack` for the window most similar to `needle`.
///
/// Both inputs are expected in canonical form. Window sizes of the needle
/// length and up to two chars either side are tried at every offset; the
/// best window scoring at least `threshold` wins, earliest on ties.
pub fn find_fuzzy_match(haystack: &str, needle: &str, threshold: f64) -> Option<FuzzyMatch> {
    let needle_len = needle.chars().count();
    if needle_len < MIN_FUZZY_NEEDLE_CHARS {
        return None;
    }

    let hay: Vec<char> = haystack.chars().collect();
    let folded_needle: Vec<char> = aggressive_fold(needle).chars().collect();
    let mut best: Option<FuzzyMatch> = None;

    for offset in WINDOW_OFFSETS {
        let window = needle_len as isize + offset;
        if window < MIN_WINDOW_CHARS as isize {
            continue;
        }
        let window = window as usize;
        if window > hay.len() {
            continue;
        }

        for start in 0..=hay.len() - window {
            let candidate: String = hay[start..start + window].iter().collect();
            let score = if candidate == needle {
                1.0
            } else {
                score_folded(&folded_needle, &candidate)
            };

            if score < threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                let exact = score >= 1.0;
                best = Some(FuzzyMatch {
                    score,
                    matched: candidate,
                    position: start,
                });
                if exact {
                    return best;
                }
            }
        }
    }

    best
}
