//! Verification types

use serde::{Deserialize, Serialize};

/// How a quote was located in the page text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Literal substring of the raw page text
    Exact,
    /// Substring after canonicalization of both sides
    Normalized,
    /// Similar window found by edit distance
    Fuzzy,
    /// Not found
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }

    /// Parse a stored match type, treating anything unknown as `None`
    pub fn parse(value: &str) -> Self {
        match value {
            "exact" => Self::Exact,
            "normalized" => Self::Normalized,
            "fuzzy" => Self::Fuzzy,
            _ => Self::None,
        }
    }
}

/// Outcome of checking one quote against one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    pub match_type: MatchType,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    /// Char offset of the match. For the exact tier this indexes the raw page
    /// text, otherwise the canonical page text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl VerificationResult {
    /// A result for a quote that could not be located
    pub fn unverified() -> Self {
        Self {
            verified: false,
            match_type: MatchType::None,
            confidence: 0.0,
            matched_text: None,
            position: None,
        }
    }

    pub(crate) fn found(
        match_type: MatchType,
        confidence: f64,
        matched_text: String,
        position: usize,
    ) -> Self {
        Self {
            verified: true,
            match_type,
            confidence,
            matched_text: Some(matched_text),
            position: Some(position),
        }
    }
}

/// Quote verification options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyOptions {
    /// Quotes shorter than this (in chars, after trimming) are rejected
    pub min_length: usize,
    /// Enable the fuzzy tier
    pub allow_fuzzy: bool,
    /// Minimum similarity for a fuzzy match
    pub fuzzy_threshold: f64,
    /// Skip fuzzy matching for canonical pages longer than this
    pub max_page_length_for_fuzzy: usize,
    /// Skip fuzzy matching for canonical quotes longer than this
    pub max_quote_length_for_fuzzy: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            min_length: 12,
            allow_fuzzy: false,
            fuzzy_threshold: 0.85,
            max_page_length_for_fuzzy: 6000,
            max_quote_length_for_fuzzy: 150,
        }
    }
}

impl VerifyOptions {
    pub fn with_fuzzy(mut self, allow: bool) -> Self {
        self.allow_fuzzy = allow;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Lower the fuzzy length caps to at most those of `limits`
    pub fn capped_by(mut self, limits: &VerifyOptions) -> Self {
        self.max_page_length_for_fuzzy = self.max_page_length_for_fuzzy.min(limits.max_page_length_for_fuzzy);
        self.max_quote_length_for_fuzzy = self
            .max_quote_length_for_fuzzy
            .min(limits.max_quote_length_for_fuzzy);
        self
    }
}
