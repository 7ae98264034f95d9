//! Report prompt templates and report metadata.

use chrono::Utc;

use crate::domain::{next_report_id, Audience, Report, ReportRequest, ReportStatus};
use crate::services::ProviderError;

const DEFAULT_SUBJECT: &str = "Patient";

/// Everything needed to turn a narrative into a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    pub prompt: String,
    pub audience: Audience,
    pub title: String,
    pub subject_name: String,
    pub source_analysis_ref: Option<String>,
    pub category: Option<String>,
    pub confidence: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ReportSynthesizer {
    default_confidence: u8,
}

impl Default for ReportSynthesizer {
    fn default() -> Self {
        Self::new(85)
    }
}

impl ReportSynthesizer {
    pub fn new(default_confidence: u8) -> Self {
        Self {
            default_confidence: default_confidence.min(100),
        }
    }

    pub fn synthesize(&self, request: &ReportRequest) -> ReportDraft {
        let prior = &request.prior;
        let subject = request
            .subject_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
            .to_string();
        let document = prior
            .display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Medical analysis");
        let category = prior.category.as_deref().unwrap_or("Not specified");
        let analysis = format!("{:#}", prior.analysis);

        let (prompt, title) = match request.audience {
            Audience::Clinical => (
                clinical_prompt(document, category, &analysis, &subject),
                format!("Medical Analysis Report - {document}"),
            ),
            Audience::Patient => (
                patient_prompt(document, &analysis, &subject),
                format!("Patient Summary - {document}"),
            ),
        };

        ReportDraft {
            prompt,
            audience: request.audience,
            title,
            subject_name: subject,
            source_analysis_ref: prior.id.clone(),
            category: prior.category.clone(),
            confidence: prior.confidence().unwrap_or(self.default_confidence),
        }
    }

    /// Attach metadata to the provider's narrative. A blank narrative is
    /// a provider failure, not a report.
    pub fn finish(&self, draft: ReportDraft, narrative: String) -> Result<Report, ProviderError> {
        let content = narrative.trim();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let generated_at = Utc::now();
        Ok(Report {
            id: next_report_id(generated_at),
            audience: draft.audience,
            title: draft.title,
            source_analysis_ref: draft.source_analysis_ref,
            subject_name: draft.subject_name,
            category: draft.category,
            content: content.to_string(),
            confidence: draft.confidence,
            generated_at,
            status: ReportStatus::Completed,
        })
    }
}

fn clinical_prompt(document: &str, category: &str, analysis: &str, subject: &str) -> String {
    format!(
        "Generate a comprehensive medical report based on the following analysis data:\n\
         \n\
         Document: {document}\n\
         Type: {category}\n\
         Analysis Results: {analysis}\n\
         Patient: {subject}\n\
         \n\
         Create a professional medical report including:\n\
         1. Executive Summary\n\
         2. Clinical Findings\n\
         3. Diagnostic Impressions\n\
         4. Recommendations\n\
         5. Follow-up Instructions\n\
         \n\
         Format it as a structured medical report for healthcare professionals."
    )
}

fn patient_prompt(document: &str, analysis: &str, subject: &str) -> String {
    format!(
        "Generate a patient-friendly summary based on the following medical analysis:\n\
         \n\
         Document: {document}\n\
         Analysis Results: {analysis}\n\
         Patient: {subject}\n\
         \n\
         Create a clear, easy-to-understand summary including:\n\
         1. What was examined\n\
         2. Key findings in simple terms\n\
         3. What this means for the patient\n\
         4. Concrete next steps\n\
         5. When to contact a healthcare provider\n\
         \n\
         Use simple language and avoid medical jargon. Be reassuring without being inaccurate."
    )
}
