// Google Gemini adapter
// REST API reference: https://ai.google.dev/api/generate-content
//
// Non-streaming calls use `models/{model}:generateContent`. Streaming calls use
// `models/{model}:streamGenerateContent?alt=sse`, which emits one JSON chunk per
// SSE event, each carrying the next slice of the answer.

use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppError, AppResult, ContentPart, LLMMessage, LLMRequest, LLMResponse, MessageContent,
    TokenUsage, ToolBinding,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

// Request types for the Gemini API
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GeminiTool {
    #[serde(rename = "googleSearch")]
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types for the Gemini API
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, all parts joined
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
        }
    }

    /// Point the adapter at a different API base (proxies, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, model, method)
    }

    fn convert_message(msg: &LLMMessage) -> GeminiContent {
        let role = match msg.role.as_str() {
            "assistant" | "model" => "model",
            _ => "user",
        };

        let parts = match &msg.content {
            MessageContent::Text(text) => vec![GeminiPart::Text { text: text.clone() }],
            MessageContent::Multimodal(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
                    ContentPart::ImageBase64 { base64, media_type } => GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: media_type.clone(),
                            data: base64.clone(),
                        },
                    },
                })
                .collect(),
        };

        GeminiContent {
            role: Some(role.to_string()),
            parts,
        }
    }

    fn build_request(request: &LLMRequest) -> GeminiRequest {
        let system_instruction = request
            .system_instruction
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: s.clone() }],
            });

        let tools = request
            .tools
            .iter()
            .map(|tool| match tool {
                ToolBinding::WebSearch => GeminiTool {
                    google_search: GoogleSearch {},
                },
            })
            .collect();

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            contents: request.messages.iter().map(Self::convert_message).collect(),
            system_instruction,
            tools,
            generation_config,
        }
    }

    async fn send(&self, url: &str, request: &LLMRequest) -> AppResult<reqwest::Response> {
        let body = Self::build_request(request);
        debug!(url = %url, messages = request.messages.len(), tools = request.tools.len(), "Sending Gemini request");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "Gemini API error ({}): {} (status: {:?})",
                    status, error_response.error.message, error_response.error.status
                )));
            }
            return Err(AppError::LLMApi(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMAdapter for GeminiAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.send(&url, request).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(error) = gemini_response.error.as_ref() {
            return Err(AppError::LLMApi(format!(
                "Gemini API error ({:?}): {}",
                error.code, error.message
            )));
        }

        let finish_reason = gemini_response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "STOP".to_string());
        let usage = gemini_response.usage_metadata.as_ref().map_or_else(
            TokenUsage::default,
            |u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            },
        );

        Ok(LLMResponse {
            content: gemini_response.text(),
            finish_reason,
            usage,
        })
    }

    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let response = self.send(&url, request).await?;

        let revisions = response
            .bytes_stream()
            .eventsource()
            .map(|event| match event {
                Ok(event) => decode_stream_chunk(&event.data),
                Err(e) => Some(Err(AppError::LLMApi(format!("Gemini stream failed: {}", e)))),
            })
            .scan(StreamProgress::default(), |progress, delta| {
                future::ready(progress.advance(delta))
            })
            .filter_map(future::ready);

        Ok(revisions.boxed())
    }
}

/// Running answer text across stream chunks; the stream ends after the first error
#[derive(Default)]
struct StreamProgress {
    accumulated: String,
    failed: bool,
}

impl StreamProgress {
    /// `None` ends the stream, `Some(None)` skips a chunk without new text
    fn advance(&mut self, delta: Option<AppResult<String>>) -> Option<Option<AppResult<String>>> {
        if self.failed {
            return None;
        }
        match delta {
            None => Some(None),
            Some(Ok(text)) if text.is_empty() => Some(None),
            Some(Ok(text)) => {
                self.accumulated.push_str(&text);
                Some(Some(Ok(self.accumulated.clone())))
            }
            Some(Err(e)) => {
                self.failed = true;
                Some(Some(Err(e)))
            }
        }
    }
}

/// Decode the data of one SSE event; `None` for empty payloads and the done marker
fn decode_stream_chunk(data: &str) -> Option<AppResult<String>> {
    let payload = data.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let chunk: GeminiResponse = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(AppError::LLMApi(format!(
                "Failed to parse Gemini stream chunk: {}",
                e
            ))))
        }
    };

    if let Some(error) = chunk.error {
        return Some(Err(AppError::LLMApi(format!(
            "Gemini stream error ({:?}): {}",
            error.code, error.message
        ))));
    }

    Some(Ok(chunk.text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request(tools: Vec<ToolBinding>) -> LLMRequest {
        LLMRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![LLMMessage::user("Oreo Cookies")],
            max_tokens: None,
            temperature: None,
            system_instruction: Some("You list ingredients.".to_string()),
            tools,
        }
    }

    #[test]
    fn test_request_shape_with_search_tool_and_image() {
        let mut req = request(vec![ToolBinding::WebSearch]);
        req.messages
            .push(LLMMessage::user_with_base64_image("name?", "aW1n", "image/png"));
        req.temperature = Some(0.2);

        let body = serde_json::to_value(GeminiAdapter::build_request(&req)).unwrap();
        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You list ingredients."
        );
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["parts"][0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(body["contents"][1]["parts"][1]["text"], "name?");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_request_omits_empty_sections() {
        let mut req = request(vec![]);
        req.system_instruction = None;
        let body = serde_json::to_value(GeminiAdapter::build_request(&req)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_decode_stream_chunk() {
        assert!(decode_stream_chunk("").is_none());
        assert!(decode_stream_chunk("[DONE]").is_none());

        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(decode_stream_chunk(data).unwrap().unwrap(), "Hello");

        assert!(decode_stream_chunk("{broken").unwrap().is_err());
        let error = r#"{"error":{"code":429,"message":"quota"}}"#;
        assert!(decode_stream_chunk(error).unwrap().is_err());
    }

    #[test]
    fn test_progress_stops_after_error() {
        let mut progress = StreamProgress::default();
        assert!(matches!(progress.advance(Some(Ok("a".to_string()))), Some(Some(Ok(t))) if t == "a"));
        assert!(matches!(progress.advance(None), Some(None)));
        assert!(matches!(progress.advance(Some(Ok("b".to_string()))), Some(Some(Ok(t))) if t == "ab"));
        assert!(matches!(
            progress.advance(Some(Err(AppError::LLMApi("x".to_string())))),
            Some(Some(Err(_)))
        ));
        assert!(progress.advance(Some(Ok("c".to_string()))).is_none());
    }

    #[tokio::test]
    async fn test_generate_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(r"/models/gemini-2\.5-flash:generateContent$".to_string()),
            )
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "tools": [{ "googleSearch": {} }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": "{\"List_of_ingredients\":[]}" }] },
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 7, "totalTokenCount": 12 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = GeminiAdapter::new("test-key").with_api_base(server.url());
        let response = adapter
            .create_chat_completion(&request(vec![ToolBinding::WebSearch]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "{\"List_of_ingredients\":[]}");
        assert_eq!(response.finish_reason, "STOP");
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(r":generateContent$".to_string()))
            .with_status(403)
            .with_body(
                json!({ "error": { "code": 403, "message": "API key invalid", "status": "PERMISSION_DENIED" } })
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter = GeminiAdapter::new("bad-key").with_api_base(server.url());
        let err = adapter
            .create_chat_completion(&request(vec![]))
            .await
            .unwrap_err();

        match err {
            AppError::LLMApi(message) => {
                assert!(message.contains("403"));
                assert!(message.contains("API key invalid"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_yields_cumulative_revisions() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"{\\\"overall\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"_score\\\":4}\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n"
        );
        let _mock = server
            .mock("POST", Matcher::Regex(r"streamGenerateContent".to_string()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let adapter = GeminiAdapter::new("test-key").with_api_base(format!("{}/", server.url()));
        let stream = adapter
            .create_chat_completion_stream(&request(vec![]))
            .await
            .unwrap();
        let revisions: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

        assert_eq!(
            revisions,
            vec!["{\"overall".to_string(), "{\"overall_score\":4}".to_string()]
        );
    }
}
