use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use medlens_backend::{
    app::{create_app, AppState},
    config::Settings,
    domain::ImageReference,
    pipeline::Pipeline,
    services::{InferenceClient, ProviderError},
};

const CBC_JSON: &str = r#"{"findings":["Normal CBC"],"concerns":[],"recommendations":["No action needed"],"confidence":96,"patientSummary":"Your blood test was normal.","technicalSummary":"CBC within reference ranges."}"#;

/// Fake provider: fixed reply, counts calls, remembers prompts.
struct FakeProvider {
    reply: Result<String, ProviderError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    healthy: bool,
}

impl FakeProvider {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            healthy: true,
        })
    }

    fn failing(err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            healthy: false,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn record(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

#[async_trait]
impl InferenceClient for FakeProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.record(prompt)
    }

    async fn complete_multimodal(
        &self,
        prompt: &str,
        _image: &ImageReference,
    ) -> Result<String, ProviderError> {
        self.record(prompt)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::Network("unreachable".into()))
        }
    }
}

fn app(provider: Arc<FakeProvider>) -> Router {
    let settings = Settings::from_lookup(|key| match key {
        "INFERENCE_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .unwrap();
    let pipeline = Pipeline::new(provider, settings.fallback);
    create_app(AppState::new(settings, pipeline))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn analyze_lab_report_structured() {
    let provider = FakeProvider::replying(CBC_JSON);
    let (status, body) = post(
        app(provider.clone()),
        "/api/analyze",
        json!({
            "sourceKind": "document",
            "category": "Lab Report",
            "content": "CBC panel: all values within normal range.",
            "displayName": "cbc.pdf"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["displayName"], "cbc.pdf");
    assert_eq!(body["analysis"]["confidence"], 96);
    assert_eq!(body["analysis"]["isDegraded"], false);
    assert!(body["processedAt"].is_string());
    assert!(body["analysisId"].is_string());
    assert_eq!(provider.calls(), 1);
    assert!(provider.last_prompt().contains("CBC panel"));
}

#[tokio::test]
async fn analyze_prose_reply_is_degraded_not_an_error() {
    let provider = FakeProvider::replying("I cannot analyze this.");
    let (status, body) = post(
        app(provider),
        "/api/analyze-document",
        json!({
            "documentText": "CBC panel: all values within normal range.",
            "documentType": "Lab Report",
            "fileName": "cbc.pdf"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["isDegraded"], true);
    assert_eq!(body["analysis"]["confidence"], 75);
    assert!(body["analysis"]["technicalSummary"]
        .as_str()
        .unwrap()
        .contains("I cannot analyze this."));
}

#[tokio::test]
async fn analyze_missing_fields_is_rejected_without_calling_provider() {
    let provider = FakeProvider::replying(CBC_JSON);

    let (status, body) = post(
        app(provider.clone()),
        "/api/analyze-document",
        json!({"documentText": "CBC panel", "fileName": "cbc.pdf"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Category and content are required");

    let (status, _) = post(
        app(provider.clone()),
        "/api/analyze",
        json!({"sourceKind": "image", "category": "X-Ray", "content": ""}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn analyze_image_echoes_image_type() {
    let provider = FakeProvider::replying(
        r#"{"structures":["Heart","Lungs"],"findings":["Clear lung fields"],"abnormalities":[],"confidence":150,"recommendations":[],"impression":"Normal chest radiograph"}"#,
    );
    let (status, body) = post(
        app(provider),
        "/api/analyze-image",
        json!({
            "imageUrl": "https://images.example.org/chest.png",
            "imageType": "X-Ray",
            "fileName": "Chest_X-Ray_Patient_001.dcm"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageType"], "X-Ray");
    assert_eq!(body["sourceKind"], "image");
    assert_eq!(body["analysis"]["confidence"], 100);
    assert_eq!(body["analysis"]["impression"], "Normal chest radiograph");
}

#[tokio::test]
async fn analyze_provider_failure_is_reported() {
    let provider = FakeProvider::failing(ProviderError::Upstream {
        status: 500,
        message: "model overloaded".into(),
    });
    let (status, body) = post(
        app(provider),
        "/api/analyze-image",
        json!({"imageUrl": "https://images.example.org/knee.png", "imageType": "MRI"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to analyze medical image");
    assert!(body.get("analysis").is_none());
}

#[tokio::test]
async fn generate_report_carries_confidence() {
    let provider = FakeProvider::replying("Executive Summary\nAll values normal.");
    let (status, body) = post(
        app(provider.clone()),
        "/api/generate-report",
        json!({
            "priorAnalysis": {
                "id": "analysis-42",
                "displayName": "cbc.pdf",
                "category": "Lab Report",
                "analysis": {"findings": ["Normal CBC"], "confidence": 91}
            },
            "audience": "clinical",
            "subjectName": "Jordan Lee"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let report = &body["report"];
    assert_eq!(report["confidence"], 91);
    assert_eq!(report["audience"], "clinical");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["sourceAnalysisRef"], "analysis-42");
    assert_eq!(report["title"], "Medical Analysis Report - cbc.pdf");
    assert!(provider.last_prompt().contains("Jordan Lee"));
}

#[tokio::test]
async fn generate_report_accepts_legacy_shape() {
    let provider = FakeProvider::replying("Your blood test looks normal.");
    let router = app(provider.clone());

    let request = json!({
        "documentData": {"id": "doc-1", "fileName": "cbc.pdf", "type": "Lab Report", "analysis": {"findings": []}},
        "reportType": "patient",
        "patientInfo": {"name": "Sam"}
    });

    let (status, first) = post(router.clone(), "/api/generate-report", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["report"]["confidence"], 85);
    assert_eq!(first["report"]["subjectName"], "Sam");

    let (_, second) = post(router, "/api/generate-report", request).await;
    assert_ne!(first["report"]["id"], second["report"]["id"]);
    assert!(provider.last_prompt().contains("avoid medical jargon"));
}

#[tokio::test]
async fn generate_report_requires_analysis_and_type() {
    let provider = FakeProvider::replying("unused");
    let (status, body) = post(
        app(provider.clone()),
        "/api/generate-report",
        json!({"audience": "patient"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Analysis data and report type are required");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn generate_report_provider_failure() {
    let provider = FakeProvider::failing(ProviderError::RateLimited);
    let (status, body) = post(
        app(provider),
        "/api/generate-report",
        json!({"priorAnalysis": {"analysis": {"confidence": 80}}, "audience": "patient"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to generate report");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let provider = FakeProvider::replying(CBC_JSON);
    let (status, body) = send(
        app(provider.clone()),
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn categorize_suggests_category() {
    let (status, body) = post(
        app(FakeProvider::replying("")),
        "/api/categorize",
        json!({"fileName": "knee_mri.png", "mimeType": "image/png"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sourceKind"], "image");
    assert_eq!(body["category"], "MRI");
}

#[tokio::test]
async fn health_reports_provider_state() {
    let request = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app(FakeProvider::replying("")), request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(
        app(FakeProvider::failing(ProviderError::Cancelled)),
        request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["inference"], "error");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = app(FakeProvider::replying(""))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn generate_report_accepts_bare_analysis_record() {
    let provider = FakeProvider::replying("Executive Summary\nNormal CBC.");
    let (status, body) = post(
        app(provider.clone()),
        "/api/generate-report",
        json!({
            "priorAnalysis": {"findings": ["Normal CBC"], "confidence": 91},
            "audience": "clinical"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["report"]["confidence"], 91);
    assert_eq!(provider.calls(), 1);
    assert!(provider.last_prompt().contains("Normal CBC"));
}

#[tokio::test]
async fn report_points_back_to_the_analysis_it_came_from() {
    let provider = FakeProvider::replying(CBC_JSON);
    let router = app(provider);

    let (status, analyzed) = post(
        router.clone(),
        "/api/analyze",
        json!({
            "sourceKind": "document",
            "category": "Lab Report",
            "content": "CBC panel: all values within normal range.",
            "displayName": "cbc.pdf"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        router,
        "/api/generate-report",
        json!({"priorAnalysis": analyzed.clone(), "audience": "patient"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["report"]["sourceAnalysisRef"], analyzed["analysisId"]);
    assert_eq!(body["report"]["confidence"], 96);
    assert_eq!(body["report"]["title"], "Patient Summary - cbc.pdf");
}

#[tokio::test]
async fn numeric_string_confidence_keeps_structured_findings() {
    let provider = FakeProvider::replying(
        r#"{"findings":["Mild anemia"],"concerns":["Low hemoglobin"],"confidence":"85"}"#,
    );
    let (status, body) = post(
        app(provider),
        "/api/analyze-document",
        json!({"documentText": "Hgb 11.2 g/dL", "documentType": "Lab Report"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["isDegraded"], false);
    assert_eq!(body["analysis"]["confidence"], 85);
    assert_eq!(body["analysis"]["findings"], json!(["Mild anemia"]));
}

#[tokio::test]
async fn caller_request_id_is_echoed() {
    let response = app(FakeProvider::replying(""))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-7f3a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-7f3a");
}
