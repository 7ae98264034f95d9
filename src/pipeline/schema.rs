//! Versioned output schema shared by the prompt builder and the parser.
//!
//! The example JSON is embedded verbatim in prompts; the record types
//! below are what the parser decodes before validating.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::SourceKind;

pub const SCHEMA_VERSION: u32 = 1;

const DOCUMENT_EXAMPLE: &str = r#"{
  "findings": ["finding1", "finding2"],
  "concerns": ["concern1", "concern2"],
  "recommendations": ["rec1", "rec2"],
  "confidence": 85,
  "patientSummary": "Simple explanation for patients",
  "technicalSummary": "Detailed medical summary"
}"#;

const IMAGE_EXAMPLE: &str = r#"{
  "structures": ["structure1", "structure2"],
  "findings": ["finding1", "finding2"],
  "abnormalities": ["abnormality1"],
  "confidence": 90,
  "recommendations": ["rec1", "rec2"],
  "impression": "Overall diagnostic impression"
}"#;

pub fn example_for(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Document => DOCUMENT_EXAMPLE,
        SourceKind::Image => IMAGE_EXAMPLE,
    }
}

/// Document output, schema v1. `findings` and `confidence` are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentRecordV1 {
    pub findings: Vec<String>,
    #[serde(default)]
    pub concerns: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    pub confidence: Confidence,
    #[serde(default)]
    pub patient_summary: Option<String>,
    #[serde(default)]
    pub technical_summary: Option<String>,
}

/// Image output, schema v1. `findings` and `confidence` are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageRecordV1 {
    #[serde(default)]
    pub structures: Option<Vec<String>>,
    pub findings: Vec<String>,
    #[serde(default)]
    pub abnormalities: Option<Vec<String>>,
    pub confidence: Confidence,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub impression: Option<String>,
}

/// Confidence as the model sent it: a JSON number, or a numeric string
/// such as `"85"` or `"85%"`. Anything else fails the record.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawConfidence")]
pub(crate) struct Confidence(f64);

impl Confidence {
    /// Rounded and clamped to [0, 100].
    pub fn clamped(self) -> u8 {
        self.0.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConfidence {
    Number(serde_json::Number),
    Text(String),
}

#[derive(Debug, Error)]
#[error("confidence must be a finite number, got {0:?}")]
pub(crate) struct NotANumber(String);

impl TryFrom<RawConfidence> for Confidence {
    type Error = NotANumber;

    fn try_from(raw: RawConfidence) -> Result<Self, Self::Error> {
        let value = match &raw {
            RawConfidence::Number(n) => n.as_f64(),
            RawConfidence::Text(s) => s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok(),
        };

        match value.filter(|v| v.is_finite()) {
            Some(v) => Ok(Self(v)),
            None => Err(NotANumber(match raw {
                RawConfidence::Number(n) => n.to_string(),
                RawConfidence::Text(s) => s,
            })),
        }
    }
}
