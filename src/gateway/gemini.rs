use super::{GatewayError, VisionModel, VisionRequest};
use crate::session::image::GATEWAY_MIME_TYPE;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ERROR_BODY_LIMIT: usize = 512;

/// Client for the `models/{model}:generateContent` endpoint.
pub struct GeminiClient {
    api_base: String,
    api_key: Option<String>,
    http: Client,
}

impl GeminiClient {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

fn build_payload(request: &VisionRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![RequestPart::Text {
                text: request.system_instruction,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: GATEWAY_MIME_TYPE,
                        data: BASE64.encode(&request.image_jpeg),
                    },
                },
                RequestPart::Text {
                    text: request.instruction,
                },
            ],
        }],
        generation_config: GenerationConfig {
            thinking_config: ThinkingConfig {
                thinking_budget: request.thinking_budget,
            },
        },
    }
}

/// Concatenated answer text of the first candidate, skipping thought parts.
fn extract_text(body: &str) -> Result<Option<String>, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, request: &VisionRequest) -> Result<Option<String>, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = build_payload(request);

        let transport = |source: reqwest::Error| GatewayError::Transport {
            endpoint: endpoint.clone(),
            source,
        };
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        debug!(status = status.as_u16(), bytes = body.len(), "gemini response received");
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate_text(&body, ERROR_BODY_LIMIT),
            });
        }

        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::{build_payload, extract_text, GeminiClient};
    use crate::gateway::{GatewayError, VisionModel, VisionRequest};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> VisionRequest {
        VisionRequest {
            model: "gemini-test".to_string(),
            system_instruction: "be a tutor",
            image_jpeg: Arc::from(&b"jpeg"[..]),
            instruction: "give a hint",
            thinking_budget: 1024,
        }
    }

    #[test]
    fn payload_carries_persona_image_instruction_and_budget() {
        let payload =
            serde_json::to_value(build_payload(&request())).expect("payload should serialize");
        assert_eq!(
            payload,
            json!({
                "systemInstruction": { "parts": [{ "text": "be a tutor" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": "anBlZw==" } },
                        { "text": "give a hint" }
                    ]
                }],
                "generationConfig": { "thinkingConfig": { "thinkingBudget": 1024 } }
            })
        );
    }

    #[test]
    fn extract_text_skips_thoughts_and_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "reasoning...", "thought": true },
                    { "text": "Check " },
                    { "text": "step 3" }
                ]}
            }]
        })
        .to_string();
        assert_eq!(
            extract_text(&body).expect("body should parse").as_deref(),
            Some("Check step 3")
        );
    }

    #[test]
    fn extract_text_treats_missing_candidates_as_empty() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        assert_eq!(extract_text(&blocked).expect("body should parse"), None);
        assert!(matches!(
            extract_text("not json"),
            Err(GatewayError::InvalidPayload(_))
        ));
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let client = GeminiClient::new("http://host/v1beta/", None);
        assert_eq!(
            client.endpoint_for_model("gemini-test"),
            "http://host/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(
            client.endpoint_for_model("models/gemini-test"),
            "http://host/v1beta/models/gemini-test:generateContent"
        );
    }

    #[tokio::test]
    async fn generate_posts_to_model_endpoint_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_partial_json(json!({
                "generationConfig": { "thinkingConfig": { "thinkingBudget": 1024 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Check step 3" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), Some("secret".to_string()));
        let text = client.generate(&request()).await.expect("request should succeed");
        assert_eq!(text.as_deref(), Some("Check step 3"));
    }

    #[tokio::test]
    async fn generate_reports_http_errors_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), Some("secret".to_string()));
        let error = client
            .generate(&request())
            .await
            .expect_err("503 should fail");
        match error {
            GatewayError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn generate_without_key_fails_before_sending() {
        let client = GeminiClient::new("http://127.0.0.1:9", None);
        let error = client
            .generate(&request())
            .await
            .expect_err("missing key should fail");
        assert!(matches!(error, GatewayError::MissingApiKey));
    }

    #[tokio::test]
    async fn generate_reports_unreachable_host_as_transport_error() {
        let client = GeminiClient::new("http://127.0.0.1:9", Some("secret".to_string()));
        let error = client
            .generate(&request())
            .await
            .expect_err("closed port should fail");
        match error {
            GatewayError::Transport { endpoint, .. } => {
                assert!(endpoint.contains("models/gemini-test:generateContent"));
                assert!(!endpoint.contains("secret"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidate_parts_yield_none() {
        let server = MockServer::start().await;
        let empty: Value = json!({ "candidates": [{ "content": { "parts": [] } }] });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), Some("secret".to_string()));
        assert_eq!(client.generate(&request()).await.expect("request should succeed"), None);
    }
}
