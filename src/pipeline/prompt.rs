//! Prompt construction per document / image category.

use crate::domain::{AnalysisContent, Category, ImageReference, SourceKind};

use super::schema::{example_for, SCHEMA_VERSION};

/// Extra instructions for categories we know something about. Matching is
/// on whole lowercase words of the category; anything else gets the
/// generic template only.
const CATEGORY_GUIDANCE: &[(&[&str], &str)] = &[
    (
        &["lab", "laboratory", "blood", "cbc"],
        "Compare every reported value with its reference range and name the values that fall outside it.",
    ),
    (
        &["notes", "note", "discharge"],
        "Separate history, examination and plan, and call out any medication changes.",
    ),
    (
        &["x-ray", "xray", "radiograph"],
        "Comment on bones, soft tissue, lung fields and the cardiac silhouette where visible.",
    ),
    (
        &["mri"],
        "Describe signal characteristics, mass effect and any enhancement pattern.",
    ),
    (
        &["ct"],
        "Describe densities, contrast enhancement and any incidental findings.",
    ),
];

/// A fully shaped inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub text: String,
    /// Present for multi-part (text + image) requests.
    pub image: Option<ImageReference>,
    pub schema: SourceKind,
    pub schema_version: u32,
}

impl PromptSpec {
    pub fn is_multimodal(&self) -> bool {
        self.image.is_some()
    }
}

pub fn build_analysis_prompt(category: &Category, content: &AnalysisContent) -> PromptSpec {
    match content {
        AnalysisContent::Text(text) => PromptSpec {
            text: document_prompt(category, text),
            image: None,
            schema: SourceKind::Document,
            schema_version: SCHEMA_VERSION,
        },
        AnalysisContent::Image(image) => PromptSpec {
            text: image_prompt(category),
            image: Some(image.clone()),
            schema: SourceKind::Image,
            schema_version: SCHEMA_VERSION,
        },
    }
}

fn document_prompt(category: &Category, text: &str) -> String {
    format!(
        "You are a medical AI assistant analyzing a {category}.\n\
         \n\
         Document content:\n\
         {text}\n\
         \n\
         Provide a comprehensive medical analysis including:\n\
         1. Key findings and observations\n\
         2. Potential concerns or abnormalities\n\
         3. Recommendations for follow-up\n\
         4. Confidence level (integer 0-100)\n\
         5. A summary in simple terms for the patient\n\
         6. A detailed technical summary for clinicians\n\
         {guidance}\
         \n\
         Respond with a single JSON object and nothing else, using exactly this structure (schema v{version}):\n\
         {example}",
        guidance = guidance_block(category),
        version = SCHEMA_VERSION,
        example = example_for(SourceKind::Document),
    )
}

fn image_prompt(category: &Category) -> String {
    format!(
        "Analyze this {category} medical image. Provide:\n\
         1. Anatomical structures visible\n\
         2. Findings\n\
         3. Any abnormalities\n\
         4. Confidence level (integer 0-100)\n\
         5. Recommendations\n\
         6. An overall diagnostic impression\n\
         {guidance}\
         \n\
         Respond with a single JSON object and nothing else, using exactly this structure (schema v{version}):\n\
         {example}",
        guidance = guidance_block(category),
        version = SCHEMA_VERSION,
        example = example_for(SourceKind::Image),
    )
}

fn guidance_block(category: &Category) -> String {
    let lowered = category.as_str().to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let lines: Vec<&str> = CATEGORY_GUIDANCE
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
        .map(|(_, guidance)| *guidance)
        .collect();

    if lines.is_empty() {
        String::new()
    } else {
        format!("\nFocus for this {category}:\n- {}\n", lines.join("\n- "))
    }
}
