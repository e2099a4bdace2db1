//! Support Chat Assistant
//!
//! Backend (`SupportAssistant`) and widget-side transcript (`ChatTranscript`)
//! for the SafeSage support chat. The two meet at the `ChatTransport` trait:
//! the widget sends `(text, history)` and gets back `{ response }`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};

pub const WELCOME_MESSAGE: &str = "Welcome to SafeSage! 👋 I'm your personal AI assistant, ready to help with any questions about crypto risk assessment, DeFi safety practices, or how to use our platform effectively. How can I assist you today?";

pub const FALLBACK_MESSAGE: &str = "I apologize for the inconvenience. I'm having trouble connecting right now. Please try again later or contact our support team if this issue persists.";

pub const SUPPORT_PROMPT: &str = r"You are the SafeSage Assistant, a crypto risk analysis expert embedded in the SafeSage dashboard.

SafeSage connects to a user's wallet, looks up market prices for the tokens it holds, and produces an AI risk report:
- every token gets a risk score from 0 to 10 with an explanation and suggestions
- the overall score is the average of the token scores
- 0 to 3 is Low risk, above 3 up to 6 is Moderate, above 6 is High

Help users understand their report, DeFi safety practices, and how to use the platform.
Keep answers short and friendly. SafeSage is for educational purposes only: never present anything as financial advice.";

/// Who wrote a transcript entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the chat transcript (wire format of the chat endpoint)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        let mut message = match msg.role {
            ChatRole::User => Self::user(msg.content.clone()),
            ChatRole::Assistant => Self::assistant(msg.content.clone()),
        };
        message.timestamp = msg.timestamp;
        message
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// `sendMessage(text, history) -> { response }`
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str, history: &[ChatMessage]) -> Result<ChatReply>;
}

/// Conversational backend for the support widget
pub struct SupportAssistant {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    system_prompt: String,
    max_context_tokens: u32,
}

impl SupportAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            system_prompt: SUPPORT_PROMPT.into(),
            max_context_tokens: 8192,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn with_max_context(mut self, max_context_tokens: u32) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    fn build_conversation(&self, text: &str, history: &[ChatMessage]) -> Conversation {
        let mut conversation = Conversation::with_system_prompt(self.system_prompt.clone())
            .with_max_context(self.max_context_tokens);
        for msg in history {
            conversation.push(Message::from(msg));
        }
        conversation.push(Message::user(text));
        conversation.truncate_to_fit();
        conversation
    }

    /// Answer `text` given the prior transcript
    pub async fn reply(&self, text: &str, history: &[ChatMessage]) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SageError::InvalidInput("Message cannot be empty".into()));
        }

        let conversation = self.build_conversation(text, history);
        tracing::debug!(
            messages = conversation.len(),
            provider = self.provider.name(),
            "Sending support chat"
        );

        let completion = self
            .provider
            .complete(conversation.messages(), &self.options)
            .await?;

        let response = completion.content.trim().to_string();
        if response.is_empty() {
            return Err(SageError::Provider("Empty response".into()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for SupportAssistant {
    async fn send_message(&self, text: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        let response = self.reply(text, history).await?;
        Ok(ChatReply { response })
    }
}

/// A message accepted by the transcript and waiting for its reply
#[derive(Clone, Debug)]
pub struct PendingSend {
    pub text: String,
    /// Transcript as it was before `text` was appended
    pub history: Vec<ChatMessage>,
}

/// Scrolling transcript shown by the chat widget
#[derive(Clone, Debug)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTranscript {
    /// New transcript seeded with the welcome greeting
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE)],
            loading: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Accept a user message. Blank input and sends while a reply is pending
    /// are ignored.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() || self.loading {
            return None;
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text));
        self.loading = true;

        Some(PendingSend {
            text: text.to_string(),
            history,
        })
    }

    /// Record the outcome of a pending send
    pub fn finish(&mut self, outcome: Result<ChatReply>) {
        let content = match outcome {
            Ok(reply) => reply.response,
            Err(e) => {
                tracing::warn!(error = %e, "Support chat failed");
                FALLBACK_MESSAGE.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(content));
        self.loading = false;
    }

    /// Full exchange: accept `text`, call the transport, record the answer.
    /// Returns false when the input was not accepted.
    pub async fn send(&mut self, transport: &dyn ChatTransport, text: &str) -> bool {
        let Some(pending) = self.begin_send(text) else {
            return false;
        };
        let outcome = transport.send_message(&pending.text, &pending.history).await;
        self.finish(outcome);
        true
    }
}
