//! Model invocation gateway
//!
//! Every agent call goes through [`AgentGateway::run`]: one ephemeral session,
//! one user turn, and a consumed stream of answer fragments. The session is
//! registered for the duration of the call and released on every exit path.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, ToolBinding};
use crate::utils::preview_text;

const PREVIEW_LEN: usize = 160;

/// Named, instruction-bearing agent with its tool bindings
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub tools: Vec<ToolBinding>,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instruction: instruction.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolBinding) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }
}

/// Process-unique run identifiers of the form `<unix-nanos>-<counter>`
#[derive(Debug, Default)]
pub struct RunIdGenerator {
    counter: AtomicU64,
}

impl RunIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared instance used when no generator is injected
    pub fn global() -> Arc<RunIdGenerator> {
        static GLOBAL: OnceLock<Arc<RunIdGenerator>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(RunIdGenerator::new())).clone()
    }

    pub fn next_id(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{}-{}", nanos, count)
    }
}

type SessionRegistry = Arc<Mutex<HashSet<String>>>;

/// An open session; dropping it releases the session id
#[derive(Debug)]
pub struct AgentSession {
    pub app_name: String,
    pub run_id: String,
    pub user_id: String,
    pub session_id: String,
    registry: SessionRegistry,
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        if let Ok(mut live) = self.registry.lock() {
            live.remove(&self.session_id);
        }
        debug!(app = %self.app_name, session_id = %self.session_id, "Agent session closed");
    }
}

#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Run `agent` once on `input` and return its trimmed final answer
    async fn run(
        &self,
        app_name: &str,
        agent: &AgentDefinition,
        input: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String>;
}

/// Gateway backed by an [`LLMAdapter`] stream, with in-memory session bookkeeping
pub struct SessionGateway {
    adapter: Arc<dyn LLMAdapter>,
    model: String,
    run_ids: Arc<RunIdGenerator>,
    live_sessions: SessionRegistry,
}

impl SessionGateway {
    pub fn new(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
            run_ids: RunIdGenerator::global(),
            live_sessions: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_run_ids(mut self, run_ids: Arc<RunIdGenerator>) -> Self {
        self.run_ids = run_ids;
        self
    }

    fn open_session(
        &self,
        app_name: &str,
        agent: &AgentDefinition,
        run_id: String,
    ) -> AppResult<AgentSession> {
        if app_name.trim().is_empty() {
            return Err(AppError::SessionCreation("app name is required".to_string()));
        }
        if agent.name.trim().is_empty() {
            return Err(AppError::SessionCreation("agent name is required".to_string()));
        }
        if agent.instruction.trim().is_empty() {
            return Err(AppError::SessionCreation(format!(
                "agent {} has no instruction",
                agent.name
            )));
        }

        let user_id = format!("safebites-agent-{}", run_id);
        let session_id = format!("safebites-session-{}", run_id);

        let mut live = self
            .live_sessions
            .lock()
            .map_err(|_| AppError::SessionCreation("session registry poisoned".to_string()))?;
        if !live.insert(session_id.clone()) {
            return Err(AppError::SessionCreation(format!(
                "session {} already exists",
                session_id
            )));
        }
        drop(live);

        Ok(AgentSession {
            app_name: app_name.to_string(),
            run_id,
            user_id,
            session_id,
            registry: self.live_sessions.clone(),
        })
    }
}

#[async_trait]
impl AgentGateway for SessionGateway {
    async fn run(
        &self,
        app_name: &str,
        agent: &AgentDefinition,
        input: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        let start = Instant::now();
        info!(
            app = %app_name,
            agent = %agent.name,
            input_len = input.len(),
            input_preview = %preview_text(input, PREVIEW_LEN),
            "Agent run started"
        );

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let session = self
            .open_session(app_name, agent, self.run_ids.next_id())
            .inspect_err(|e| {
                error!(app = %app_name, stage = "session_create", error = %e, "Agent run failed")
            })?;

        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(input)],
            max_tokens: None,
            temperature: None,
            system_instruction: Some(agent.instruction.clone()),
            tools: agent.tools.clone(),
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.adapter.create_chat_completion_stream(&request) => result,
        };
        let mut stream = opened.inspect_err(|e| {
            error!(app = %app_name, session_id = %session.session_id, stage = "run_stream", error = %e, "Agent run failed")
        })?;

        let mut answer: Option<String> = None;
        let mut events = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(app = %app_name, session_id = %session.session_id, events, "Agent run cancelled");
                    return Err(AppError::Cancelled);
                }
                item = stream.next() => item,
            };

            match next {
                None => break,
                Some(Ok(fragment)) => {
                    events += 1;
                    if !fragment.trim().is_empty() {
                        answer = Some(fragment);
                    }
                }
                Some(Err(e)) => {
                    error!(app = %app_name, session_id = %session.session_id, stage = "run_stream", events, error = %e, "Agent run failed");
                    return Err(e);
                }
            }
        }

        let Some(answer) = answer else {
            error!(
                app = %app_name,
                session_id = %session.session_id,
                stage = "empty_output",
                events,
                duration_ms = start.elapsed().as_millis() as u64,
                "Agent run failed"
            );
            return Err(AppError::EmptyOutput);
        };

        let answer = answer.trim().to_string();
        info!(
            app = %app_name,
            session_id = %session.session_id,
            events,
            duration_ms = start.elapsed().as_millis() as u64,
            output_len = answer.len(),
            output_preview = %preview_text(&answer, PREVIEW_LEN),
            "Agent run complete"
        );
        Ok(answer)
    }
}
