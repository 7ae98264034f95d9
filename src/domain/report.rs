//! Report records and the prior analysis a report is built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::ValidationError;

static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Target reader of a generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Clinical,
    Patient,
}

impl Audience {
    /// Accepts "clinical" (or the legacy "medical") and "patient".
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "clinical" | "medical" | "clinician" => Ok(Self::Clinical),
            "patient" => Ok(Self::Patient),
            other => Err(ValidationError::UnknownAudience(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
}

/// Keys that mark an object as an analysis record rather than a wrapper.
const ANALYSIS_FIELDS: &[&str] = &[
    "findings",
    "concerns",
    "recommendations",
    "confidence",
    "patientSummary",
    "technicalSummary",
    "structures",
    "abnormalities",
    "impression",
];

/// A previously produced analysis, as handed back by the caller.
///
/// Three shapes are accepted: an analyze result (`analysisId` + `analysis`),
/// the legacy document wrapper (`id`, `fileName`, `type`, `analysis`), and a
/// bare analysis record, which becomes `analysis` as a whole.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", from = "PriorAnalysisWire")]
pub struct PriorAnalysis {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub analysis: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriorAnalysisWire {
    #[serde(default, alias = "analysisId")]
    id: Option<Value>,
    #[serde(default, alias = "fileName")]
    display_name: Option<String>,
    #[serde(default, alias = "type")]
    category: Option<String>,
    #[serde(default)]
    analysis: Value,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<PriorAnalysisWire> for PriorAnalysis {
    fn from(wire: PriorAnalysisWire) -> Self {
        // Numeric ids come from older clients
        let id = match wire.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let analysis = if wire.analysis.is_null()
            && ANALYSIS_FIELDS.iter().any(|k| wire.rest.contains_key(*k))
        {
            Value::Object(wire.rest)
        } else {
            wire.analysis
        };

        Self {
            id,
            display_name: wire.display_name,
            category: wire.category,
            analysis,
        }
    }
}

impl PriorAnalysis {
    /// Confidence carried by the stored analysis, clamped to [0, 100].
    pub fn confidence(&self) -> Option<u8> {
        self.analysis
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map(|c| c.round().clamp(0.0, 100.0) as u8)
    }
}

/// Input of the generate-report operation.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub prior: PriorAnalysis,
    pub audience: Audience,
    pub subject_name: Option<String>,
}

impl ReportRequest {
    pub fn new(
        prior: Option<PriorAnalysis>,
        audience: Option<&str>,
        subject_name: Option<String>,
    ) -> Result<Self, ValidationError> {
        let prior = prior
            .filter(|p| !p.analysis.is_null())
            .ok_or(ValidationError::MissingReportInput)?;
        let audience = audience
            .filter(|a| !a.trim().is_empty())
            .ok_or(ValidationError::MissingReportInput)?;

        Ok(Self {
            prior,
            audience: Audience::parse(audience)?,
            subject_name,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub audience: Audience,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_analysis_ref: Option<String>,
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub content: String,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
    pub status: ReportStatus,
}

/// `RPT-<unix millis>-<process sequence>`; unique within a process.
pub fn next_report_id(now: DateTime<Utc>) -> String {
    let seq = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("RPT-{}-{:06}", now.timestamp_millis(), seq)
}
