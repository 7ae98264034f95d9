//! Analysis request and result records.
//!
//! Field names serialise in camelCase to match the wire format the
//! front end already consumes (`patientSummary`, `isDegraded`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::pipeline::ValidationError;

/// Whether the input is a text document or an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "Document")]
    Document,
    #[serde(alias = "Image")]
    Image,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
        }
    }
}

/// Open-ended document or image category ("Lab Report", "X-Ray", ...).
///
/// Never an enum: new categories must flow through without code changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute URL pointing at an image (`http(s)`, `data:` or `blob:`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let url = url::Url::parse(trimmed)
            .map_err(|_| ValidationError::InvalidImageReference(trimmed.to_string()))?;

        match url.scheme() {
            "http" | "https" | "data" | "blob" => Ok(Self(trimmed.to_string())),
            _ => Err(ValidationError::InvalidImageReference(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payload of an analysis request; the variant fixes the source kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisContent {
    Text(String),
    Image(ImageReference),
}

/// Unvalidated analyze input as it arrives from a caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInput {
    pub source_kind: SourceKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A validated analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub category: Category,
    pub content: AnalysisContent,
    pub display_name: String,
}

impl AnalysisRequest {
    /// Validate raw input; blank category or content is rejected.
    pub fn from_input(input: AnalyzeInput) -> Result<Self, ValidationError> {
        let category = input.category.and_then(Category::new);
        let content = input.content.filter(|c| !c.trim().is_empty());

        let (category, content) = match (category, content) {
            (Some(category), Some(content)) => (category, content),
            _ => return Err(ValidationError::MissingAnalysisInput),
        };

        let content = match input.source_kind {
            SourceKind::Document => AnalysisContent::Text(content),
            SourceKind::Image => AnalysisContent::Image(ImageReference::parse(&content)?),
        };

        let display_name = input
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Untitled {}", input.source_kind.as_str()));

        Ok(Self {
            category,
            content,
            display_name,
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.content {
            AnalysisContent::Text(_) => SourceKind::Document,
            AnalysisContent::Image(_) => SourceKind::Image,
        }
    }
}

/// Structured analysis of a text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub findings: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: u8,
    pub patient_summary: String,
    pub technical_summary: String,
    pub is_degraded: bool,
}

/// Structured analysis of a medical image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub structures: Vec<String>,
    pub findings: Vec<String>,
    pub abnormalities: Vec<String>,
    pub confidence: u8,
    pub recommendations: Vec<String>,
    pub impression: String,
    pub is_degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Analysis {
    Document(DocumentAnalysis),
    Image(ImageAnalysis),
}

impl Analysis {
    pub fn confidence(&self) -> u8 {
        match self {
            Self::Document(a) => a.confidence,
            Self::Image(a) => a.confidence,
        }
    }

    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Document(a) => a.is_degraded,
            Self::Image(a) => a.is_degraded,
        }
    }
}

/// Outcome of a successful analyze operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub analysis: Analysis,
    pub processed_at: DateTime<Utc>,
    pub display_name: String,
    pub category: Category,
    pub source_kind: SourceKind,
}
