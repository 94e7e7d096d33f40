//! Core protocol types for Spark chat interactions
//!
//! These are the caller-facing values: conversation messages, sampling
//! parameters, function definitions, and the streamed/aggregated response
//! shapes. Wire-level request and response envelopes live in
//! `client::wire` and are not exposed.

use crate::error::{SparkError, SparkResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// A single message in the conversation. Ordering within the message list
/// is the conversation order and is preserved on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Sampling parameters for a chat request
///
/// The service validates ranges on its side; values outside the documented
/// ranges are rejected with a remote error rather than checked locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequestParameters {
    /// Overrides the model version's domain when set. Leave `None` to use
    /// the domain supplied by the [`ModelVersion`](crate::model::ModelVersion).
    pub domain: Option<String>,

    /// Randomness of the result, range [0, 1]. Default: 0.5
    pub temperature: f32,

    /// Maximum length of the model response in tokens, range [1, 4096].
    /// Default: 2048
    pub max_tokens: u32,

    /// Optional conversation identifier, used by the service to correlate
    /// turns of the same chat
    pub chat_id: Option<String>,

    /// Number of candidates to sample from, range [1, 6]
    pub top_k: Option<u32>,
}

impl Default for ChatRequestParameters {
    fn default() -> Self {
        Self {
            domain: None,
            temperature: 0.5,
            max_tokens: 2048,
            chat_id: None,
            top_k: None,
        }
    }
}

impl ChatRequestParameters {
    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum response length in tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the conversation identifier
    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Set the top-k sampling parameter
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Override the model version's domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// A function the model may ask the caller to invoke
///
/// The service never executes functions itself; it only *describes* which
/// function it wants called. The caller runs it out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Function name returned by the service when the function is triggered
    pub name: String,

    /// Detailed description used by the model to decide when to call it
    pub description: String,

    /// Parameter list, in declaration order
    pub parameters: Vec<FunctionParameter>,
}

impl FunctionDef {
    /// Create a function definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<FunctionParameter>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A single parameter of a [`FunctionDef`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParameter {
    /// Parameter name
    pub name: String,

    /// Data type description, e.g. `string` or `date`
    pub param_type: String,

    /// Detailed description of the parameter
    pub description: String,

    /// Whether the parameter is required
    pub required: bool,
}

impl FunctionParameter {
    /// Create a required parameter
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }

    /// Mark the parameter as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call
    pub name: String,

    /// Raw JSON arguments string; the caller parses it against its own
    /// schema
    pub arguments: String,
}

/// Token usage totals, reported on the terminal frame of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensUsage {
    /// Reserved field, can be ignored
    pub question_tokens: u32,

    /// Tokens of the full prompt, including history
    pub prompt_tokens: u32,

    /// Tokens of the answer
    pub completion_tokens: u32,

    /// Sum of prompt and completion tokens; this is the billed size
    pub total_tokens: u32,
}

/// One partial result, decoded from a single response frame
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedChatResponse {
    /// Text delta carried by the frame
    pub text: String,

    /// Token usage; populated only on the terminal frame
    pub usage: Option<TokensUsage>,

    /// Content type of the delta (e.g. `text`), when the service reports one
    pub content_type: Option<String>,

    /// Function call requested by the model, when present
    pub function_call: Option<FunctionCall>,
}

impl fmt::Display for StreamedChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The aggregate of all partial results of one call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    responses: Vec<StreamedChatResponse>,
}

impl ChatResponse {
    /// Build the aggregate from the ordered partials of one call.
    ///
    /// An empty sequence is a contract violation and fails with
    /// [`SparkError::EmptyStream`].
    pub fn new(responses: Vec<StreamedChatResponse>) -> SparkResult<Self> {
        if responses.is_empty() {
            return Err(SparkError::EmptyStream);
        }
        Ok(Self { responses })
    }

    /// Concatenated text of all partials, in arrival order
    pub fn text(&self) -> String {
        self.responses.iter().map(|r| r.text.as_str()).collect()
    }

    /// Token usage of the terminal frame.
    ///
    /// Fails with [`SparkError::MissingUsage`] when the service omitted
    /// usage on the last frame; text access is unaffected.
    pub fn usage(&self) -> SparkResult<TokensUsage> {
        self.responses
            .last()
            .and_then(|r| r.usage)
            .ok_or(SparkError::MissingUsage)
    }

    /// First function call found in the partials, if the model requested one
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.responses.iter().find_map(|r| r.function_call.as_ref())
    }

    /// The underlying partials, in arrival order
    pub fn streamed_responses(&self) -> &[StreamedChatResponse] {
        &self.responses
    }
}

impl fmt::Display for ChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
