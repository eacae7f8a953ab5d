//! Tiered quote verification
//!
//! Tiers run cheapest first and the first hit wins:
//! exact substring, canonical substring, then (opt-in) fuzzy window search.

use crate::text::{canonicalize, find_fuzzy_match};

use super::types::{MatchType, VerificationResult, VerifyOptions};

/// Confidence reported for a canonical-form substring match
pub const NORMALIZED_CONFIDENCE: f64 = 0.95;

/// Verifies quotes against page text with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct QuoteVerifier {
    options: VerifyOptions,
}

impl QuoteVerifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn verify(&self, page_text: &str, quote_text: &str) -> VerificationResult {
        verify_quote(page_text, quote_text, &self.options)
    }
}

/// Check whether `quote_text` appears on a page whose OCR text is `page_text`.
pub fn verify_quote(
    page_text: &str,
    quote_text: &str,
    options: &VerifyOptions,
) -> VerificationResult {
    if quote_text.trim().chars().count() < options.min_length {
        return VerificationResult::unverified();
    }

    if let Some(byte_pos) = page_text.find(quote_text) {
        return VerificationResult::found(
            MatchType::Exact,
            1.0,
            quote_text.to_string(),
            char_offset(page_text, byte_pos),
        );
    }

    let page = canonicalize(page_text);
    let quote = canonicalize(quote_text);

    if quote.is_empty() {
        return VerificationResult::unverified();
    }

    if let Some(byte_pos) = page.find(&quote) {
        let position = char_offset(&page, byte_pos);
        return VerificationResult::found(MatchType::Normalized, NORMALIZED_CONFIDENCE, quote, position);
    }

    if !options.allow_fuzzy {
        return VerificationResult::unverified();
    }

    let page_len = page.chars().count();
    let quote_len = quote.chars().count();
    if page_len > options.max_page_length_for_fuzzy || quote_len > options.max_quote_length_for_fuzzy {
        tracing::trace!(
            page_len,
            quote_len,
            "Skipping fuzzy verification, input exceeds length caps"
        );
        return VerificationResult::unverified();
    }

    match find_fuzzy_match(&page, &quote, options.fuzzy_threshold) {
        Some(found) => {
            VerificationResult::found(MatchType::Fuzzy, found.score, found.matched, found.position)
        }
        None => VerificationResult::unverified(),
    }
}

fn char_offset(text: &str, byte_pos: usize) -> usize {
    text[..byte_pos].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "Present Levels of Academic Achievement: The student demonstrated significant \
        progress in reading comprehension this year and met two of three annual goals.";

    #[test]
    fn test_exact_match() {
        let quote = "significant progress in reading";
        let result = verify_quote(PAGE, quote, &VerifyOptions::default());

        assert!(result.verified);
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.matched_text.as_deref(), Some(quote));
        assert_eq!(result.position, PAGE.find(quote));
    }

    #[test]
    fn test_exact_position_is_char_offset() {
        let page = "\u{00E9}\u{00E9}\u{00E9} the annual goal was met";
        let result = verify_quote(page, "the annual goal was met", &VerifyOptions::default());
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.position, Some(4));
    }

    #[test]
    fn test_normalized_match() {
        let result = verify_quote(
            "Student\u{2019}s IEP \u{2014} review",
            "Student's IEP - review",
            &VerifyOptions::default(),
        );

        assert!(result.verified);
        assert_eq!(result.match_type, MatchType::Normalized);
        assert_eq!(result.confidence, NORMALIZED_CONFIDENCE);
        assert_eq!(result.matched_text.as_deref(), Some("Student's IEP - review"));
        assert_eq!(result.position, Some(0));
    }

    #[test]
    fn test_normalized_match_across_hyphenation() {
        let page = "Goal 2: improve reading compre-\nhension to grade level.";
        let result = verify_quote(page, "improve reading comprehension", &VerifyOptions::default());
        assert_eq!(result.match_type, MatchType::Normalized);
        assert_eq!(result.position, Some(8));
    }

    #[test]
    fn test_short_quote_rejected() {
        let result = verify_quote("short", "short", &VerifyOptions::default());
        assert!(!result.verified);
        assert_eq!(result.match_type, MatchType::None);
        assert_eq!(result.confidence, 0.0);

        let result = verify_quote(PAGE, "   short    ", &VerifyOptions::default());
        assert_eq!(result.match_type, MatchType::None);
    }

    #[test]
    fn test_empty_inputs() {
        let options = VerifyOptions::default();
        assert_eq!(verify_quote("", "", &options), VerificationResult::unverified());
        assert_eq!(
            verify_quote("", "a quote that is long enough", &options),
            VerificationResult::unverified()
        );

        let lenient = VerifyOptions::default().with_min_length(0);
        let result = verify_quote("", "", &lenient);
        assert!(result.verified);
        assert_eq!(result.match_type, MatchType::Exact);
    }

    #[test]
    fn test_fuzzy_disabled_by_default() {
        let quote = "demonstrated signifcant progress in reading";
        let result = verify_quote(PAGE, quote, &VerifyOptions::default());
        assert_eq!(result.match_type, MatchType::None);
        assert!(!result.verified);
    }

    #[test]
    fn test_fuzzy_match_when_enabled() {
        let quote = "demonstrated signifcant progress in reading";
        let options = VerifyOptions::default().with_fuzzy(true);
        let result = verify_quote(PAGE, quote, &options);

        assert!(result.verified);
        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert!(result.confidence >= options.fuzzy_threshold);
        assert!(result.confidence < 1.0);
        assert!(result.matched_text.unwrap().starts_with("demonstrated"));
    }

    #[test]
    fn test_fuzzy_skipped_for_long_quote() {
        let options = VerifyOptions {
            allow_fuzzy: true,
            max_quote_length_for_fuzzy: 30,
            ..VerifyOptions::default()
        };
        let result = verify_quote(PAGE, "demonstrated signifcant progress in reading", &options);
        assert_eq!(result.match_type, MatchType::None);
    }

    #[test]
    fn test_fuzzy_skipped_for_long_page() {
        let options = VerifyOptions {
            allow_fuzzy: true,
            max_page_length_for_fuzzy: 50,
            ..VerifyOptions::default()
        };
        let result = verify_quote(PAGE, "demonstrated signifcant progress in reading", &options);
        assert_eq!(result.match_type, MatchType::None);

        // The cheaper tiers still run on long pages
        let result = verify_quote(PAGE, "met two of three annual goals", &options);
        assert_eq!(result.match_type, MatchType::Exact);
    }

    #[test]
    fn test_unrelated_quote() {
        let options = VerifyOptions::default().with_fuzzy(true);
        let result = verify_quote(PAGE, "receives speech therapy twice weekly", &options);
        assert_eq!(result, VerificationResult::unverified());
    }

    #[test]
    fn test_verifier_uses_configured_options() {
        let verifier = QuoteVerifier::new(VerifyOptions::default().with_fuzzy(true));
        let result = verifier.verify(PAGE, "demonstrated signifcant progress in reading");
        assert_eq!(result.match_type, MatchType::Fuzzy);
    }
}
