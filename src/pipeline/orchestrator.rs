//! The two externally visible operations: analyze and generate-report.
//!
//! Each call validates, issues exactly one inference call (retries, if any,
//! live inside the client) and returns. Nothing is kept between calls.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::error::{Operation, PipelineError};
use super::parser::ResultParser;
use super::prompt::build_analysis_prompt;
use super::report::ReportSynthesizer;
use crate::config::FallbackSettings;
use crate::domain::{
    AnalysisRequest, AnalysisResult, AnalyzeInput, PriorAnalysis, Report, ReportRequest, SourceKind,
};
use crate::services::{InferenceClient, ProviderError};

#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn InferenceClient>,
    parser: ResultParser,
    synthesizer: ReportSynthesizer,
}

impl Pipeline {
    pub fn new(client: Arc<dyn InferenceClient>, fallback: FallbackSettings) -> Self {
        Self {
            client,
            parser: ResultParser::new(fallback),
            synthesizer: ReportSynthesizer::new(fallback.report_confidence),
        }
    }

    /// Validate raw input, then analyze it.
    pub async fn analyze(&self, input: AnalyzeInput) -> Result<AnalysisResult, PipelineError> {
        let request = AnalysisRequest::from_input(input)?;
        self.analyze_request(request).await
    }

    #[instrument(
        skip_all,
        fields(
            source_kind = request.source_kind().as_str(),
            category = %request.category,
            display_name = %request.display_name,
        )
    )]
    pub async fn analyze_request(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, PipelineError> {
        let operation = match request.source_kind() {
            SourceKind::Document => Operation::AnalyzeDocument,
            SourceKind::Image => Operation::AnalyzeImage,
        };
        let prompt = build_analysis_prompt(&request.category, &request.content);

        let outcome = match &prompt.image {
            Some(image) => self.client.complete_multimodal(&prompt.text, image).await,
            None => self.client.complete(&prompt.text).await,
        };
        let raw = outcome.map_err(|source| provider_failure(operation, source))?;

        let analysis = self.parser.parse(&raw, prompt.schema);
        info!(
            confidence = analysis.confidence(),
            degraded = analysis.is_degraded(),
            "Analysis completed"
        );

        Ok(AnalysisResult {
            analysis_id: Uuid::new_v4(),
            analysis,
            processed_at: Utc::now(),
            display_name: request.display_name,
            category: request.category,
            source_kind: prompt.schema,
        })
    }

    /// Validate raw input, then generate a report.
    pub async fn generate_report(
        &self,
        prior: Option<PriorAnalysis>,
        audience: Option<&str>,
        subject_name: Option<String>,
    ) -> Result<Report, PipelineError> {
        let request = ReportRequest::new(prior, audience, subject_name)?;
        self.generate_report_request(request).await
    }

    #[instrument(skip_all, fields(audience = ?request.audience))]
    pub async fn generate_report_request(
        &self,
        request: ReportRequest,
    ) -> Result<Report, PipelineError> {
        let draft = self.synthesizer.synthesize(&request);

        let report = match self.client.complete(&draft.prompt).await {
            Ok(narrative) => self.synthesizer.finish(draft, narrative),
            Err(e) => Err(e),
        }
        .map_err(|source| provider_failure(Operation::GenerateReport, source))?;

        info!(report_id = %report.id, confidence = report.confidence, "Report generated");
        Ok(report)
    }

    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.client.health_check().await
    }
}

fn provider_failure(operation: Operation, source: ProviderError) -> PipelineError {
    error!(operation = %operation, error = %source, "Inference call failed");
    PipelineError::Provider { operation, source }
}
