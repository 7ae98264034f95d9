//! Medical document and image analysis service.
//!
//! Shapes a prompt per document/image category, calls a generative-text
//! provider once, parses the reply into a structured analysis (falling back
//! to a flagged degraded record when the reply does not fit the schema),
//! and turns stored analyses into clinician or patient reports.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod services;
