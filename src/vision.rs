// Product name extraction from a photo
//
// A single direct model call with the image inline; no agent session and no
// local image decoding.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::prompts::VISION_OCR_PROMPT;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Normalized mime type, or `None` when the model cannot take it. Blank means JPEG.
pub fn normalize_mime_type(mime_type: &str) -> Option<String> {
    let mime_type = mime_type.trim();
    if mime_type.is_empty() {
        return Some(DEFAULT_IMAGE_MIME_TYPE.to_string());
    }
    let lower = mime_type.to_ascii_lowercase();
    SUPPORTED_MIME_TYPES.contains(&lower.as_str()).then_some(lower)
}

pub struct VisionOcr {
    adapter: Arc<dyn LLMAdapter>,
    model: String,
}

impl VisionOcr {
    pub fn new(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
        }
    }

    pub async fn extract_product_name(
        &self,
        image: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        if image.is_empty() {
            return Err(AppError::InvalidArgument("image bytes are required".to_string()));
        }
        let media_type = normalize_mime_type(mime_type).ok_or_else(|| {
            AppError::InvalidArgument(format!("unsupported image mime type: {}", mime_type))
        })?;

        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user_with_base64_image(
                VISION_OCR_PROMPT,
                STANDARD.encode(image),
                media_type.as_str(),
            )],
            max_tokens: None,
            temperature: None,
            system_instruction: None,
            tools: Vec::new(),
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            response = self.adapter.create_chat_completion(&request) => response?,
        };

        let name = response.content.trim();
        if name.is_empty() {
            return Err(AppError::EmptyOutput);
        }

        info!(image_bytes = image.len(), media_type = %media_type, product = %name, "Product name extracted");
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedAdapter;
    use crate::types::{ContentPart, MessageContent};

    fn ocr(adapter: &Arc<ScriptedAdapter>) -> VisionOcr {
        VisionOcr::new(adapter.clone(), "gemini-2.5-flash")
    }

    #[test]
    fn test_normalize_mime_type() {
        assert_eq!(normalize_mime_type("").as_deref(), Some("image/jpeg"));
        assert_eq!(normalize_mime_type("  IMAGE/PNG ").as_deref(), Some("image/png"));
        assert_eq!(normalize_mime_type("image/heif").as_deref(), Some("image/heif"));
        assert!(normalize_mime_type("image/gif").is_none());
        assert!(normalize_mime_type("application/pdf").is_none());
    }

    #[tokio::test]
    async fn test_sends_image_inline_and_trims_answer() {
        let adapter = Arc::new(ScriptedAdapter::with_texts(["  Oreo Cookies \n"]));
        let name = ocr(&adapter)
            .extract_product_name(b"\xff\xd8\xff", "", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(name, "Oreo Cookies");

        let requests = adapter.requests();
        assert!(requests[0].tools.is_empty());
        match &requests[0].messages[0].content {
            MessageContent::Multimodal(parts) => {
                match &parts[0] {
                    ContentPart::ImageBase64 { base64, media_type } => {
                        assert_eq!(media_type, "image/jpeg");
                        assert_eq!(base64, &STANDARD.encode(b"\xff\xd8\xff"));
                    }
                    other => panic!("expected image part, got {:?}", other),
                }
                assert!(matches!(&parts[1], ContentPart::Text { text } if text == VISION_OCR_PROMPT));
            }
            other => panic!("expected multimodal content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_input_without_call() {
        let adapter = Arc::new(ScriptedAdapter::with_texts(["unused"]));
        let cancel = CancellationToken::new();

        let err = ocr(&adapter)
            .extract_product_name(&[], "image/png", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: image bytes are required");

        let err = ocr(&adapter)
            .extract_product_name(b"GIF89a", "image/gif", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: unsupported image mime type: image/gif");

        assert_eq!(adapter.remaining(), 1);
    }

    #[tokio::test]
    async fn test_blank_answer_is_empty_output() {
        let adapter = Arc::new(ScriptedAdapter::with_texts(["   "]));
        let result = ocr(&adapter)
            .extract_product_name(b"img", "image/webp", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::EmptyOutput)));
    }
}
