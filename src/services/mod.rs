//! Service layer for the external inference provider.
//!
//! Contains the provider contract, its HTTP implementation, and the
//! retry/timeout/cancellation decorator.

pub mod ai_client;
pub mod inference;
pub mod resilience;

pub use ai_client::HttpInferenceClient;
pub use inference::{InferenceClient, ProviderError};
pub use resilience::{ResilientClient, RetryPolicy, TimeoutPolicy};
