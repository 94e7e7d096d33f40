//! Streaming WebSocket client for the iFlytek Spark chat API
//!
//! One call is one connection: the client signs a time-limited URL, sends
//! a single JSON request frame and reassembles the streamed response
//! frames into either a lazy stream of partials or one aggregated answer.
//!
//! ```no_run
//! use spark_core::{ChatMessage, ChatOptions, ChatRequestParameters, ModelVersion, SparkClient};
//!
//! # async fn example() -> spark_core::SparkResult<()> {
//! let client = SparkClient::from_env()?;
//! let response = client
//!     .chat(
//!         &ModelVersion::Lite,
//!         &[ChatMessage::user("湖南的省会在哪？")],
//!         &ChatRequestParameters::default(),
//!         ChatOptions::default(),
//!     )
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod protocol;

pub use client::{ChatOptions, ChatStream, SparkClient};
pub use config::{SecretString, SparkCredentials};
pub use error::{SparkError, SparkResult};
pub use model::ModelVersion;
pub use protocol::types::{
    ChatMessage, ChatRequestParameters, ChatResponse, FunctionCall, FunctionDef,
    FunctionParameter, MessageRole, StreamedChatResponse, TokensUsage,
};

/// Returns the version of the library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
