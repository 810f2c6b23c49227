//! AI collaborators for the concierge dispatch service.
//!
//! This crate provides the two external collaborators a dispatch talks to:
//!
//! - **Completion**: one chat completion call that either answers in text or
//!   selects a function from the tool catalog
//! - **Retrieval**: similarity search that grounds the prompt with snippets
//!   from the hotel knowledge base
//!
//! Both are traits so the dispatch engine can run against scripted fakes.

pub mod backend;
pub mod credentials;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod retrieval;

pub use backend::{
    ChatMessage, ChatRole, Completion, CompletionBackend, CompletionRequest, CompletionResponse,
    LlmProvider, TokenUsage,
};
pub use credentials::{ApiKey, Credentials};
pub use error::{LlmError, RetrievalError};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, PromptTemplate};
pub use retrieval::{PineconeRetriever, RetrievalConfig, Retriever, Snippet};
