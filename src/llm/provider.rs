use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Stream the answer as a sequence of revisions.
    ///
    /// Each item is the full answer text as known so far, so the last
    /// non-empty item is the complete answer. Adapters without a streaming
    /// endpoint emit the whole completion as a single item.
    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        let response = self.create_chat_completion(request).await?;
        Ok(stream::once(async move { Ok(response.content) }).boxed())
    }
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    /// Override of the provider's API base URL
    pub api_base: Option<String>,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let adapter: Box<dyn LLMAdapter> = match provider.name.as_str() {
            "google" | "gemini" => {
                let adapter = crate::llm::google::GeminiAdapter::new(&provider.api_key);
                match provider.api_base {
                    Some(base) => Box::new(adapter.with_api_base(base)),
                    None => Box::new(adapter),
                }
            }
            other => {
                return Err(AppError::Configuration(format!(
                    "unsupported LLM provider: {}",
                    other
                )))
            }
        };

        Ok(Self { adapter })
    }
}

#[async_trait]
impl LLMAdapter for LLM {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        self.adapter.create_chat_completion_stream(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LLMMessage, TokenUsage};

    struct FixedAdapter;

    #[async_trait]
    impl LLMAdapter for FixedAdapter {
        async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
            Ok(LLMResponse {
                content: "whole answer".to_string(),
                finish_reason: "STOP".to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn request() -> LLMRequest {
        LLMRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![LLMMessage::user("hi")],
            max_tokens: None,
            temperature: None,
            system_instruction: None,
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_revision() {
        let stream = FixedAdapter
            .create_chat_completion_stream(&request())
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "whole answer");
    }

    #[test]
    fn test_provider_selection() {
        for name in ["google", "gemini"] {
            let llm = LLM::new(LLMProviderConfig {
                name: name.to_string(),
                api_key: "key".to_string(),
                api_base: None,
            });
            assert!(llm.is_ok(), "{} should be accepted", name);
        }

        let result = LLM::new(LLMProviderConfig {
            name: "openai".to_string(),
            api_key: "key".to_string(),
            api_base: None,
        });
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
