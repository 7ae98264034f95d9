//! Domain types shared by the pipeline and the HTTP layer.

pub mod analysis;
pub mod category;
pub mod report;

pub use analysis::*;
pub use category::{categorize, Categorized};
pub use report::*;
