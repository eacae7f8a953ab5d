//! Evidence and citation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ocr::BoundingBox;
use crate::verify::VerificationResult;

/// One piece of evidence the LLM cites for a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Page number in the source document (1-indexed)
    pub page: u32,
    /// Text the LLM claims appears on that page
    pub quote: String,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Confidence reported by the LLM
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// An extracted value together with the evidence supporting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWithEvidence<T> {
    pub value: T,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl<T> FieldWithEvidence<T> {
    pub fn new(value: T, evidence: Vec<Evidence>) -> Self {
        Self { value, evidence }
    }

    pub fn has_evidence(&self) -> bool {
        !self.evidence.is_empty()
    }
}

/// Evidence item addressed to a field of the extracted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEvidence {
    /// Dotted path of the field, e.g. `goals.0.baseline`
    pub field_path: String,
    #[serde(flatten)]
    pub evidence: Evidence,
}

/// Outcome recorded on a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Quote located on the cited page
    Verified,
    /// Page exists but the quote could not be located
    Failed,
    /// Page text unavailable, nothing to verify against
    Skipped,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "verified" => Self::Verified,
            "skipped" => Self::Skipped,
            _ => Self::Failed,
        }
    }
}

/// A claimed fact linked to its verified (or failed) source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: String,
    pub document_id: String,
    pub field_path: String,
    pub page_number: u32,
    pub quote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_confidence: Option<f64>,
    pub verification: VerificationResult,
    pub verification_status: VerificationStatus,
    pub verified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_with_evidence_deserialize() {
        let json = r#"{
            "value": "45 words per minute",
            "evidence": [
                {"page": 3, "quote": "reads 45 words per minute", "confidence": 0.9},
                {"page": 4, "quote": "oral reading fluency of 45 wpm",
                 "bbox": {"x": 0.1, "y": 0.5, "width": 0.6, "height": 0.04}}
            ]
        }"#;

        let field: FieldWithEvidence<String> = serde_json::from_str(json).unwrap();
        assert_eq!(field.value, "45 words per minute");
        assert_eq!(field.evidence.len(), 2);
        assert_eq!(field.evidence[0].bbox, None);
        assert_eq!(field.evidence[1].confidence, None);
        assert!(field.evidence[1].bbox.unwrap().is_normalized());
    }

    #[test]
    fn test_missing_evidence_defaults_empty() {
        let field: FieldWithEvidence<u32> = serde_json::from_str(r#"{"value": 3}"#).unwrap();
        assert!(!field.has_evidence());
    }

    #[test]
    fn test_field_evidence_flattened() {
        let item: FieldEvidence = serde_json::from_str(
            r#"{"fieldPath": "services.0.frequency", "page": 7, "quote": "twice weekly for 30 minutes"}"#,
        )
        .unwrap();
        assert_eq!(item.field_path, "services.0.frequency");
        assert_eq!(item.evidence.page, 7);
    }
}
