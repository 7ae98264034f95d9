//! Analysis-and-report pipeline.
//!
//! Prompt construction, result parsing with degraded-mode fallback, report
//! synthesis, and the orchestrator that sequences them around a single
//! inference call.

pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod schema;

pub use error::{Operation, PipelineError, ValidationError};
pub use orchestrator::Pipeline;
pub use parser::ResultParser;
pub use prompt::{build_analysis_prompt, PromptSpec};
pub use report::{ReportDraft, ReportSynthesizer};
