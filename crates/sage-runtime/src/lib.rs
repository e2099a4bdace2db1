//! # sage-runtime
//!
//! Concrete `LlmProvider` backends for SafeSage.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference, used for both risk scoring and the
//!   support assistant
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sage_runtime::OllamaProvider;
//!
//! let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::from_env());
//! let scorer = LlmRiskScorer::new(provider, GenerationOptions::structured("llama3.2"));
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

pub use sage_core::{GenerationOptions, LlmProvider, Message, Result, Role, SageError};
