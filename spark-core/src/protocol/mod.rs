//! Protocol module for Spark chat request/response structures
//!
//! Defines the caller-facing data model: messages, sampling parameters,
//! function definitions, and the streamed/aggregated response shapes.

pub mod types;

pub use types::{
    ChatMessage, ChatRequestParameters, ChatResponse, FunctionCall, FunctionDef,
    FunctionParameter, MessageRole, StreamedChatResponse, TokensUsage,
};
