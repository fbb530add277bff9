//! [`LlmAdapter`]: the narrow interface between the pipeline and whatever
//! model provider is actually generating proposals, critiques, and
//! fidelity judgments. Real providers (OpenAI, Anthropic, a local model
//! server) live outside this crate; [`MockLlmAdapter`] is the reference
//! implementation used by tests and the CLI's offline demo mode.

use crate::error::{CollabError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A completed chat call's usage, for cost tracking (`total_cost_usd` in
/// the design record accumulates this across every call in a round).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Usage,
}

/// A chat-completion provider. One adapter instance is shared across a
/// run's collaborator slots; implementations must be safe to call
/// concurrently from multiple fan-out workers.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<LlmResponse>;

    /// Whether this adapter is configured and reachable. The supervisor
    /// node checks this before assigning a collaborator slot to it.
    fn is_available(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn LlmAdapter>;
}

impl Clone for Box<dyn LlmAdapter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Replays a fixed queue of canned responses, failing the test loudly if
/// asked for more completions than it was given. Used in place of a real
/// provider wherever a test needs deterministic, free, offline output.
pub struct MockLlmAdapter {
    responses: Mutex<VecDeque<String>>,
    available: bool,
}

impl MockLlmAdapter {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self { responses: Mutex::new(VecDeque::new()), available: false }
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    async fn complete(&self, _system: &str, _messages: &[Message]) -> Result<LlmResponse> {
        if !self.available {
            return Err(CollabError::Llm("adapter not configured".into()));
        }
        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CollabError::Llm("mock adapter ran out of canned responses".into()))?;
        Ok(LlmResponse { content, usage: Usage::default() })
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn clone_box(&self) -> Box<dyn LlmAdapter> {
        Box::new(MockLlmAdapter {
            responses: Mutex::new(self.responses.lock().unwrap().clone()),
            available: self.available,
        })
    }
}

/// One turn's outcome in a proposal worker's bounded tool loop: either the
/// model called the sandbox tool with a code submission, or it produced
/// plain text, which ends the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolCall {
    SubmitCode { code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallingReply {
    pub tool_call: Option<ToolCall>,
    pub text: String,
    pub usage: Usage,
}

/// Extends [`LlmAdapter`] with a tool-calling turn, used by the proposal
/// worker's bounded coder loop (spec §4.5, §9 "Bounded agentic loops").
#[async_trait]
pub trait ToolCallingLlmAdapter: Send + Sync {
    async fn complete_with_tools(&self, system: &str, messages: &[Message]) -> Result<ToolCallingReply>;
}

/// Replays a fixed sequence of turns. A `Some(code)` entry simulates the
/// model submitting code through the sandbox tool; `None` simulates the
/// model ending the loop with plain text.
pub struct MockToolCallingLlmAdapter {
    turns: Mutex<VecDeque<Option<String>>>,
}

impl MockToolCallingLlmAdapter {
    pub fn new(turns: impl IntoIterator<Item = Option<String>>) -> Self {
        Self { turns: Mutex::new(turns.into_iter().collect()) }
    }

    /// A worker that submits `code` on its first turn, then ends the loop
    /// with plain text on the next. The bounded coder loop keeps prompting
    /// after a submission until the model stops calling the tool (§4.5), so
    /// a realistic one-shot worker needs both turns queued.
    pub fn single_submission(code: impl Into<String>) -> Self {
        Self::new([Some(code.into()), None])
    }

    /// A worker that never calls the tool, producing an empty-code failure.
    pub fn silent() -> Self {
        Self::new([None])
    }
}

#[async_trait]
impl ToolCallingLlmAdapter for MockToolCallingLlmAdapter {
    async fn complete_with_tools(&self, _system: &str, _messages: &[Message]) -> Result<ToolCallingReply> {
        let next = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CollabError::Llm("mock tool-calling adapter ran out of turns".into()))?;
        match next {
            Some(code) => Ok(ToolCallingReply { tool_call: Some(ToolCall::SubmitCode { code }), text: String::new(), usage: Usage::default() }),
            None => Ok(ToolCallingReply { tool_call: None, text: "done".into(), usage: Usage::default() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_canned_responses_in_order() {
        let adapter = MockLlmAdapter::new(["first", "second"]);
        let r1 = adapter.complete("sys", &[Message::user("hi")]).await.unwrap();
        let r2 = adapter.complete("sys", &[Message::user("hi")]).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }

    #[tokio::test]
    async fn mock_errors_when_exhausted() {
        let adapter = MockLlmAdapter::new(Vec::<String>::new());
        assert!(adapter.complete("sys", &[]).await.is_err());
    }

    #[tokio::test]
    async fn unavailable_mock_reports_itself() {
        let adapter = MockLlmAdapter::unavailable();
        assert!(!adapter.is_available());
        assert!(adapter.complete("sys", &[]).await.is_err());
    }

    #[tokio::test]
    async fn single_submission_adapter_submits_then_would_exhaust() {
        let adapter = MockToolCallingLlmAdapter::single_submission("fn build() {}");
        let reply = adapter.complete_with_tools("sys", &[]).await.unwrap();
        assert!(matches!(reply.tool_call, Some(ToolCall::SubmitCode { code }) if code == "fn build() {}"));
    }

    #[tokio::test]
    async fn silent_adapter_never_calls_the_tool() {
        let adapter = MockToolCallingLlmAdapter::silent();
        let reply = adapter.complete_with_tools("sys", &[]).await.unwrap();
        assert!(reply.tool_call.is_none());
    }
}
