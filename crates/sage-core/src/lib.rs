//! # sage-core
//!
//! Provider-agnostic LLM plumbing shared by the SafeSage services.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  risk-report scorer          support assistant              │
//! │        │                            │                       │
//! │        └──────────┬─────────────────┘                       │
//! │                   ▼                                         │
//! │            LlmProvider (Strategy)  ── Ollama, mocks, ...    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The risk scorer and the support assistant only talk to the `LlmProvider`
//! trait, so the backing model can be swapped without touching either.

pub mod assistant;
pub mod error;
pub mod message;
pub mod provider;

pub use assistant::{ChatMessage, ChatReply, ChatRole, ChatTranscript, ChatTransport, SupportAssistant};
pub use error::{Result, SageError};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
