use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// One OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub text: ProviderEndpoint,
    pub vision: ProviderEndpoint,
    pub timeout_seconds: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_interval: Duration,
    pub retry_max_interval: Duration,
}

/// Tuning for the degraded-mode parser and report metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    pub document_confidence: u8,
    pub image_confidence: u8,
    pub summary_chars: usize,
    pub report_confidence: u8,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            document_confidence: 75,
            image_confidence: 70,
            summary_chars: 200,
            report_confidence: 85,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // HTTP
    pub cors_allow_origins: Vec<String>,
    pub max_body_bytes: usize,

    // Inference provider
    pub inference: InferenceSettings,

    // Parser / report defaults
    pub fallback: FallbackSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let env = Environment::from_str(&lookup("ENV").unwrap_or_else(|| "dev".to_string()));
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        // HTTP
        let cors_allow_origins = lookup("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let max_body_bytes = parsed("MAX_BODY_BYTES").unwrap_or(10 * 1024 * 1024) as usize;

        // Inference provider
        let base_url = lookup("INFERENCE_BASE_URL")
            .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string());
        validate_base_url(&base_url).context("INFERENCE_BASE_URL is invalid")?;
        let api_key = lookup("INFERENCE_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .context("INFERENCE_API_KEY must be set")?;
        let text_model = lookup("INFERENCE_TEXT_MODEL")
            .unwrap_or_else(|| "llama-3.1-70b-versatile".to_string());

        let vision_base_url = lookup("INFERENCE_VISION_BASE_URL").unwrap_or_else(|| base_url.clone());
        validate_base_url(&vision_base_url).context("INFERENCE_VISION_BASE_URL is invalid")?;
        let vision_api_key = lookup("INFERENCE_VISION_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| api_key.clone());
        let vision_model =
            lookup("INFERENCE_VISION_MODEL").unwrap_or_else(|| "grok-vision-beta".to_string());

        let timeout_seconds = parsed("INFERENCE_TIMEOUT_SECONDS").unwrap_or(120); // LLM calls are slow
        let retry_max_attempts = parsed("INFERENCE_RETRY_MAX_ATTEMPTS")
            .map(|n| n.clamp(1, 10) as u32)
            .unwrap_or(1);
        let retry_initial_interval =
            Duration::from_millis(parsed("INFERENCE_RETRY_INITIAL_MS").unwrap_or(500));
        let retry_max_interval =
            Duration::from_millis(parsed("INFERENCE_RETRY_MAX_MS").unwrap_or(8000));

        // Parser / report defaults
        let defaults = FallbackSettings::default();
        let confidence = |key: &str, default: u8| {
            parsed(key).map(|n| n.min(100) as u8).unwrap_or(default)
        };
        let fallback = FallbackSettings {
            document_confidence: confidence(
                "FALLBACK_DOCUMENT_CONFIDENCE",
                defaults.document_confidence,
            ),
            image_confidence: confidence("FALLBACK_IMAGE_CONFIDENCE", defaults.image_confidence),
            summary_chars: parsed("FALLBACK_SUMMARY_CHARS")
                .map(|n| n as usize)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.summary_chars),
            report_confidence: confidence("REPORT_DEFAULT_CONFIDENCE", defaults.report_confidence),
        };

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            max_body_bytes,
            inference: InferenceSettings {
                text: ProviderEndpoint {
                    base_url,
                    api_key,
                    model: text_model,
                },
                vision: ProviderEndpoint {
                    base_url: vision_base_url,
                    api_key: vision_api_key,
                    model: vision_model,
                },
                timeout_seconds,
                retry_max_attempts,
                retry_initial_interval,
                retry_max_interval,
            },
            fallback,
        })
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("unsupported scheme {other}")),
    }
}
