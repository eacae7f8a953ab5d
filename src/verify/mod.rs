//! Quote Verification Module
//!
//! Decides whether an LLM-produced quote appears on a page of OCR text,
//! tolerating OCR noise, and grades the match.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iep_evidence_server::verify::{QuoteVerifier, VerifyOptions};
//!
//! let verifier = QuoteVerifier::new(VerifyOptions::default().with_fuzzy(true));
//! let result = verifier.verify(&page.text, "reads 45 words per minute");
//! if result.verified {
//!     println!("{:?} at {:?}", result.match_type, result.position);
//! }
//! ```

mod types;
mod verifier;

pub use types::{MatchType, VerificationResult, VerifyOptions};
pub use verifier::{verify_quote, QuoteVerifier, NORMALIZED_CONFIDENCE};
