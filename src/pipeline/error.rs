use std::fmt;
use thiserror::Error;

use crate::services::ProviderError;

/// Missing or malformed caller input. Raised before any inference call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Category and content are required")]
    MissingAnalysisInput,

    #[error("Analysis data and report type are required")]
    MissingReportInput,

    #[error("Image reference must be a valid URL: {0}")]
    InvalidImageReference(String),

    #[error("Unknown report type: {0}")]
    UnknownAudience(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AnalyzeDocument,
    AnalyzeImage,
    GenerateReport,
}

impl Operation {
    /// Stable, caller-facing failure message.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::AnalyzeDocument => "Failed to analyze document",
            Self::AnalyzeImage => "Failed to analyze medical image",
            Self::GenerateReport => "Failed to generate report",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AnalyzeDocument => "analyze_document",
            Self::AnalyzeImage => "analyze_image",
            Self::GenerateReport => "generate_report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: Operation,
        #[source]
        source: ProviderError,
    },
}
