//! Evidence and citations
//!
//! LLM extraction produces values with supporting quotes
//! ([`FieldWithEvidence`]). [`CitationVerifier`] checks those quotes against
//! the extracted page text and stores the outcome as [`Citation`]s.

mod types;
mod verifier;

pub use types::{Citation, Evidence, FieldEvidence, FieldWithEvidence, VerificationStatus};
pub use verifier::CitationVerifier;
