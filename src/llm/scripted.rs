// Scripted adapter used by the agent and workflow tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

pub(crate) enum ScriptedReply {
    /// One revision carrying the whole answer
    Text(String),
    /// Several stream items, delivered in order
    Fragments(Vec<String>),
    /// The given items, then a stream that never yields again
    Stalled(Vec<String>),
    /// The call fails with `AppError::LLMApi`
    Error(String),
}

/// Replays queued replies in order and records every request it receives
pub(crate) struct ScriptedAdapter {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedAdapter {
    pub(crate) fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a script made only of whole-text replies
    pub(crate) fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| ScriptedReply::Text(t.into()))
                .collect(),
        )
    }

    pub(crate) fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next_reply(&self, request: &LLMRequest) -> AppResult<ScriptedReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::LLMApi("no scripted responses left".to_string()))
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let content = match self.next_reply(request)? {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Fragments(fragments) | ScriptedReply::Stalled(fragments) => {
                fragments.concat()
            }
            ScriptedReply::Error(message) => return Err(AppError::LLMApi(message)),
        };
        Ok(LLMResponse {
            content,
            finish_reason: "STOP".to_string(),
            usage: TokenUsage::default(),
        })
    }

    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        match self.next_reply(request)? {
            ScriptedReply::Text(text) => Ok(stream::iter(vec![Ok(text)]).boxed()),
            ScriptedReply::Fragments(fragments) => {
                Ok(stream::iter(fragments.into_iter().map(Ok)).boxed())
            }
            ScriptedReply::Stalled(fragments) => Ok(stream::iter(fragments.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            ScriptedReply::Error(message) => Err(AppError::LLMApi(message)),
        }
    }
}
