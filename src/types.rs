// Type definitions shared by the model adapters, the agent runtime and the workflow

/// Tool capabilities an agent may bind when it talks to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ToolBinding {
    /// Grounded web search performed by the model provider
    WebSearch,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_instruction: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
}

/// Content part for multimodal messages
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_base64")]
    ImageBase64 {
        base64: String,
        media_type: String, // e.g., "image/jpeg", "image/png"
    },
}

/// Message content - can be simple text or multimodal (text + images)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Multimodal(Vec<ContentPart>),
}

impl MessageContent {
    /// Get the text content (for simple text or first text part in multimodal)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            MessageContent::Multimodal(parts) => parts.iter().find_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "model"
    pub content: MessageContent,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a user message with a base64 image (for vision calls)
    pub fn user_with_base64_image(
        text: impl Into<String>,
        base64: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Multimodal(vec![
                ContentPart::ImageBase64 {
                    base64: base64.into(),
                    media_type: media_type.into(),
                },
                ContentPart::Text { text: text.into() },
            ]),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("create agent session: {0}")]
    SessionCreation(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("agent returned empty text")]
    EmptyOutput,

    #[error("no valid json object found in agent response")]
    NoJsonObjectFound,

    #[error("{context}: {source}")]
    Parse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialize agent payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{phase}: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn parse(context: &'static str, source: serde_json::Error) -> Self {
        AppError::Parse { context, source }
    }

    /// Wrap an error with the workflow phase or service step that produced it
    pub fn in_phase(phase: &'static str, source: AppError) -> Self {
        AppError::Phase {
            phase,
            source: Box::new(source),
        }
    }

    /// The innermost error, with every phase wrapper removed
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::Phase { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Phase names from outermost to innermost
    pub fn phases(&self) -> Vec<&'static str> {
        let mut phases = Vec::new();
        let mut current = self;
        while let AppError::Phase { phase, source } = current {
            phases.push(*phase);
            current = source;
        }
        phases
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
