//! Credential configuration for the Spark client
//!
//! The three credentials (`app_id`, `api_key`, `api_secret`) come from the
//! open platform control panel. They are treated as opaque strings; empty
//! values fail fast with a configuration error before any network activity.

mod secrets;

pub use secrets::SecretString;

use crate::error::{SparkError, SparkResult};

/// Environment variable holding the application id
pub const ENV_APP_ID: &str = "SPARK_APP_ID";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "SPARK_API_KEY";
/// Environment variable holding the API secret
pub const ENV_API_SECRET: &str = "SPARK_API_SECRET";
/// Environment variable holding the optional user id
pub const ENV_UID: &str = "SPARK_UID";

/// Credentials for one Spark application
#[derive(Debug, Clone, PartialEq)]
pub struct SparkCredentials {
    /// Application id from the open platform control panel
    pub app_id: String,

    /// API key used in the signed connection URL
    pub api_key: SecretString,

    /// API secret used as the HMAC signing key
    pub api_secret: SecretString,

    /// Optional user id, used by the service to distinguish end users
    pub uid: Option<String>,
}

impl SparkCredentials {
    /// Create credentials, failing fast on empty values
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<SecretString>,
        api_secret: impl Into<SecretString>,
    ) -> SparkResult<Self> {
        let credentials = Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            uid: None,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Load credentials from `SPARK_APP_ID`, `SPARK_API_KEY`,
    /// `SPARK_API_SECRET` and optionally `SPARK_UID`
    pub fn from_env() -> SparkResult<Self> {
        let app_id = require_env(ENV_APP_ID)?;
        let api_key = require_env(ENV_API_KEY)?;
        let api_secret = require_env(ENV_API_SECRET)?;
        let mut credentials = Self::new(app_id, api_key, api_secret)?;
        credentials.uid = std::env::var(ENV_UID).ok().filter(|v| !v.is_empty());
        Ok(credentials)
    }

    /// Attach a user id
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    fn validate(&self) -> SparkResult<()> {
        if self.app_id.is_empty() {
            return Err(SparkError::Configuration(
                "app_id must not be empty".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(SparkError::Configuration(
                "api_key must not be empty".to_string(),
            ));
        }
        if self.api_secret.is_empty() {
            return Err(SparkError::Configuration(
                "api_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_env(var: &str) -> SparkResult<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(SparkError::Configuration(format!(
            "environment variable '{}' is not set",
            var
        ))),
    }
}
