//! Model version registry for the Spark API
//!
//! Each version pairs a `domain` string (sent in the request parameters)
//! with the versioned WebSocket path the connection must use. The client
//! only consumes the resulting URL and domain; it does not validate
//! version identifiers.

use std::fmt;

/// Host of the public Spark API
const DEFAULT_HOST: &str = "spark-api.xf-yun.com";

/// A selectable model version of the Spark service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelVersion {
    /// The `Lite` version, suitable for basic use cases
    Lite,
    /// The `V2` version, an enhancement over `Lite` in the `generalv2` domain
    V2_0,
    /// The `Pro` version, for professional usage in the `generalv3` domain
    Pro,
    /// The `Max` version, offering advanced features in `generalv3.5`
    Max,
    /// The `4.0 Ultra` version, the most advanced configuration available
    V4_0Ultra,
    /// A custom endpoint, e.g. a privately deployed service
    Custom {
        /// Display name for logs
        display_name: String,
        /// Domain string sent in the request parameters
        domain: String,
        /// Full WebSocket endpoint URL
        websocket_url: String,
    },
}

impl ModelVersion {
    /// Human-readable name of the version
    pub fn display_name(&self) -> &str {
        match self {
            ModelVersion::Lite => "Lite",
            ModelVersion::V2_0 => "V2",
            ModelVersion::Pro => "Pro",
            ModelVersion::Max => "Max",
            ModelVersion::V4_0Ultra => "4.0 Ultra",
            ModelVersion::Custom { display_name, .. } => display_name,
        }
    }

    /// Domain string for the `parameter.chat.domain` request field
    pub fn domain(&self) -> &str {
        match self {
            ModelVersion::Lite => "general",
            ModelVersion::V2_0 => "generalv2",
            ModelVersion::Pro => "generalv3",
            ModelVersion::Max => "generalv3.5",
            ModelVersion::V4_0Ultra => "4.0Ultra",
            ModelVersion::Custom { domain, .. } => domain,
        }
    }

    /// Versioned path segment of the public API endpoint
    fn address_part(&self) -> &str {
        match self {
            ModelVersion::Lite => "v1.1",
            ModelVersion::V2_0 => "v2.1",
            ModelVersion::Pro => "v3.1",
            ModelVersion::Max => "v3.5",
            ModelVersion::V4_0Ultra => "v4.0",
            ModelVersion::Custom { .. } => unreachable!("custom versions carry a full URL"),
        }
    }

    /// Full WebSocket endpoint URL for this version
    pub fn websocket_url(&self) -> String {
        match self {
            ModelVersion::Custom { websocket_url, .. } => websocket_url.clone(),
            _ => format!("wss://{}/{}/chat", DEFAULT_HOST, self.address_part()),
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_urls() {
        assert_eq!(
            ModelVersion::Lite.websocket_url(),
            "wss://spark-api.xf-yun.com/v1.1/chat"
        );
        assert_eq!(
            ModelVersion::V4_0Ultra.websocket_url(),
            "wss://spark-api.xf-yun.com/v4.0/chat"
        );
        assert_eq!(ModelVersion::Max.domain(), "generalv3.5");
    }

    #[test]
    fn test_custom_version() {
        let version = ModelVersion::Custom {
            display_name: "on-prem".to_string(),
            domain: "general".to_string(),
            websocket_url: "wss://spark.internal/v1.1/chat".to_string(),
        };
        assert_eq!(version.websocket_url(), "wss://spark.internal/v1.1/chat");
        assert_eq!(version.domain(), "general");
        assert_eq!(version.to_string(), "on-prem");
    }
}
