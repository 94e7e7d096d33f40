//! The Spark chat client
//!
//! One client holds one set of credentials and opens a fresh, signed
//! WebSocket connection per call. Three call shapes share the same
//! underlying driver: [`SparkClient::chat_stream`] yields each partial,
//! [`SparkClient::chat`] collects them into one aggregate, and
//! [`SparkClient::chat_with_callback`] pushes each partial into a caller
//! sink and returns the final token usage.

pub(crate) mod stream;
pub(crate) mod wire;

pub use stream::ChatStream;

use crate::auth;
use crate::config::SparkCredentials;
use crate::error::SparkResult;
use crate::model::ModelVersion;
use crate::protocol::types::{
    ChatMessage, ChatRequestParameters, ChatResponse, FunctionDef, StreamedChatResponse,
    TokensUsage,
};
use futures_util::StreamExt;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-call options: function definitions offered to the model and the
/// cancellation signal
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Functions the model may ask the caller to invoke
    pub functions: Vec<FunctionDef>,

    /// Cancellation signal, observed at every suspension point of the call
    pub cancellation: CancellationToken,
}

impl ChatOptions {
    /// Offer function definitions to the model
    pub fn with_functions(mut self, functions: Vec<FunctionDef>) -> Self {
        self.functions = functions;
        self
    }

    /// Attach a caller-controlled cancellation token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Client for the Spark chat service
///
/// Cheap to clone; holds no connection state. Every call opens, drives
/// and releases its own connection.
#[derive(Debug, Clone)]
pub struct SparkClient {
    credentials: SparkCredentials,
}

impl SparkClient {
    /// Create a client from validated credentials
    pub fn new(credentials: SparkCredentials) -> Self {
        Self { credentials }
    }

    /// Create a client from the `SPARK_*` environment variables
    pub fn from_env() -> SparkResult<Self> {
        Ok(Self::new(SparkCredentials::from_env()?))
    }

    /// Send one request and stream the partial results.
    ///
    /// The returned stream yields one [`StreamedChatResponse`] per frame,
    /// in arrival order, and ends after the terminal frame. A failure ends
    /// the stream with a terminal `Err`; partials already yielded are not
    /// retracted.
    pub async fn chat_stream(
        &self,
        model: &ModelVersion,
        messages: &[ChatMessage],
        parameters: &ChatRequestParameters,
        options: ChatOptions,
    ) -> SparkResult<ChatStream> {
        let endpoint = model.websocket_url();
        let signed = auth::signed_url(
            self.credentials.api_key.expose_secret(),
            self.credentials.api_secret.expose_secret(),
            &endpoint,
            SystemTime::now(),
        )?;
        let request = wire::encode_request(
            &self.credentials.app_id,
            self.credentials.uid.as_deref(),
            model.domain(),
            parameters,
            messages,
            &options.functions,
        )?;
        debug!(model = %model, endpoint = %endpoint, "starting chat call");
        stream::open_stream(signed, request, options.cancellation).await
    }

    /// Send one request and collect the whole answer.
    ///
    /// Runs the stream to completion and folds every partial into a
    /// [`ChatResponse`]. Any mid-stream failure fails the whole call.
    pub async fn chat(
        &self,
        model: &ModelVersion,
        messages: &[ChatMessage],
        parameters: &ChatRequestParameters,
        options: ChatOptions,
    ) -> SparkResult<ChatResponse> {
        let mut stream = self.chat_stream(model, messages, parameters, options).await?;
        let mut partials = Vec::new();
        while let Some(item) = stream.next().await {
            partials.push(item?);
        }
        ChatResponse::new(partials)
    }

    /// Send one request, invoking `on_partial` for every partial result.
    ///
    /// Returns the token usage of the terminal frame, or `None` when the
    /// service omitted it.
    pub async fn chat_with_callback(
        &self,
        model: &ModelVersion,
        messages: &[ChatMessage],
        parameters: &ChatRequestParameters,
        options: ChatOptions,
        mut on_partial: impl FnMut(&StreamedChatResponse),
    ) -> SparkResult<Option<TokensUsage>> {
        let mut stream = self.chat_stream(model, messages, parameters, options).await?;
        let mut usage = None;
        while let Some(item) = stream.next().await {
            let partial = item?;
            on_partial(&partial);
            if partial.usage.is_some() {
                usage = partial.usage;
            }
        }
        Ok(usage)
    }
}
