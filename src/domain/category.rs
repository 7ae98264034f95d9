//! Filename / MIME based categorizer.
//!
//! Callers may use this to fill in `category` before analyzing; the
//! pipeline itself accepts any category string.

use serde::Serialize;

use super::analysis::{Category, SourceKind};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp", "dcm",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorized {
    pub source_kind: SourceKind,
    pub category: Category,
}

pub fn categorize(display_name: &str, mime_type: Option<&str>) -> Categorized {
    let name = display_name.trim().to_lowercase();
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    let is_image = mime_type
        .map(|m| m.trim().to_lowercase().starts_with("image/"))
        .unwrap_or(false)
        || IMAGE_EXTENSIONS.contains(&extension);

    if is_image {
        Categorized {
            source_kind: SourceKind::Image,
            category: Category::from_static(image_category(&name)),
        }
    } else {
        Categorized {
            source_kind: SourceKind::Document,
            category: Category::from_static(document_category(extension)),
        }
    }
}

fn image_category(name: &str) -> &'static str {
    if name.contains("xray") || name.contains("x-ray") {
        "X-Ray"
    } else if name.contains("mri") {
        "MRI"
    } else if name.contains("ct") {
        "CT Scan"
    } else {
        "Medical Image"
    }
}

fn document_category(extension: &str) -> &'static str {
    match extension {
        "pdf" => "Lab Report",
        "txt" => "Clinical Notes",
        "docx" => "Medical Report",
        _ => "Medical Document",
    }
}
