//! Converts raw provider text into analysis records.
//!
//! Decoding is strict: the text must be a single JSON object (optionally
//! inside one Markdown code fence) carrying the schema's required fields.
//! Any [`FormatError`] is absorbed here and turned into a degraded record,
//! so `parse` has no failure case.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use super::schema::{DocumentRecordV1, ImageRecordV1};
use crate::config::FallbackSettings;
use crate::domain::{Analysis, DocumentAnalysis, ImageAnalysis, SourceKind};

const EMPTY_RESPONSE_NOTE: &str = "The analysis service returned no readable text.";
const ELLIPSIS: &str = "...";

#[derive(Debug, Error)]
pub(crate) enum FormatError {
    #[error("response is empty")]
    Empty,

    #[error("response is not JSON: {0}")]
    Syntax(serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("response does not match the expected schema: {0}")]
    Shape(serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    fallback: FallbackSettings,
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new(FallbackSettings::default())
    }
}

impl ResultParser {
    pub fn new(fallback: FallbackSettings) -> Self {
        Self { fallback }
    }

    pub fn parse(&self, raw: &str, kind: SourceKind) -> Analysis {
        match kind {
            SourceKind::Document => Analysis::Document(self.parse_document(raw)),
            SourceKind::Image => Analysis::Image(self.parse_image(raw)),
        }
    }

    pub fn parse_document(&self, raw: &str) -> DocumentAnalysis {
        match decode::<DocumentRecordV1>(raw) {
            Ok(record) => DocumentAnalysis {
                findings: clean(record.findings),
                concerns: clean(record.concerns.unwrap_or_default()),
                recommendations: clean(record.recommendations.unwrap_or_default()),
                confidence: record.confidence.clamped(),
                patient_summary: record.patient_summary.unwrap_or_default().trim().to_string(),
                technical_summary: record.technical_summary.unwrap_or_default().trim().to_string(),
                is_degraded: false,
            },
            Err(e) => {
                warn!(error = %e, raw_chars = raw.chars().count(), "Document analysis degraded");
                self.degraded_document(raw)
            }
        }
    }

    pub fn parse_image(&self, raw: &str) -> ImageAnalysis {
        match decode::<ImageRecordV1>(raw) {
            Ok(record) => ImageAnalysis {
                structures: clean(record.structures.unwrap_or_default()),
                findings: clean(record.findings),
                abnormalities: clean(record.abnormalities.unwrap_or_default()),
                confidence: record.confidence.clamped(),
                recommendations: clean(record.recommendations.unwrap_or_default()),
                impression: record.impression.unwrap_or_default().trim().to_string(),
                is_degraded: false,
            },
            Err(e) => {
                warn!(error = %e, raw_chars = raw.chars().count(), "Image analysis degraded");
                self.degraded_image(raw)
            }
        }
    }

    fn degraded_document(&self, raw: &str) -> DocumentAnalysis {
        let full = raw.trim();
        DocumentAnalysis {
            findings: vec!["Analysis completed".to_string()],
            concerns: vec!["Please review with healthcare provider".to_string()],
            recommendations: vec!["Follow up as needed".to_string()],
            confidence: self.fallback.document_confidence,
            patient_summary: excerpt(raw, self.fallback.summary_chars),
            technical_summary: if full.is_empty() {
                EMPTY_RESPONSE_NOTE.to_string()
            } else {
                full.to_string()
            },
            is_degraded: true,
        }
    }

    fn degraded_image(&self, raw: &str) -> ImageAnalysis {
        ImageAnalysis {
            structures: vec!["Image analyzed".to_string()],
            findings: vec!["Please review with radiologist".to_string()],
            abnormalities: Vec::new(),
            confidence: self.fallback.image_confidence,
            recommendations: vec!["Professional review recommended".to_string()],
            impression: excerpt(raw, self.fallback.summary_chars),
            is_degraded: true,
        }
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, FormatError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(FormatError::Empty);
    }

    let value: serde_json::Value = serde_json::from_str(body).map_err(FormatError::Syntax)?;
    if !value.is_object() {
        return Err(FormatError::NotAnObject);
    }

    serde_json::from_value(value).map_err(FormatError::Shape)
}

/// Body of a single surrounding ``` fence (language tag dropped), or the
/// trimmed input when there is none.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// First `budget` characters of `raw` followed by an ellipsis.
///
/// The ellipsis is appended even when nothing was cut: the excerpt is
/// always a preview of the full text kept elsewhere, and front ends
/// written against the web app render it that way.
fn excerpt(raw: &str, budget: usize) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return EMPTY_RESPONSE_NOTE.to_string();
    }

    let head: String = text.chars().take(budget).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}
