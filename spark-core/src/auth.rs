//! Signed connection URLs for the Spark WebSocket endpoint
//!
//! The service authenticates the WebSocket handshake itself: the client
//! signs a canonical request description with HMAC-SHA256 and passes the
//! result as query parameters of the connection URL. Signatures embed the
//! wall-clock time and expire quickly; a stale `now` is rejected by the
//! service at connect time.

use crate::error::{SparkError, SparkResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::SystemTime;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Build the signed connection URL for `endpoint`.
///
/// The canonical string is
/// `host: {host}\ndate: {rfc1123(now)}\nGET {path} HTTP/1.1`, signed with
/// HMAC-SHA256 under `api_secret`. The authorization header value is then
/// base64-encoded a second time; this double encoding is required by the
/// protocol. `authorization`, `date` and `host` are appended to the
/// endpoint as percent-encoded query parameters.
///
/// Two calls with the same `now` produce identical URLs.
pub fn signed_url(
    api_key: &str,
    api_secret: &str,
    endpoint: &str,
    now: SystemTime,
) -> SparkResult<String> {
    if api_key.is_empty() {
        return Err(SparkError::Configuration(
            "api_key must not be empty".to_string(),
        ));
    }
    if api_secret.is_empty() {
        return Err(SparkError::Configuration(
            "api_secret must not be empty".to_string(),
        ));
    }

    let url = Url::parse(endpoint).map_err(|e| {
        SparkError::Configuration(format!("invalid endpoint URL '{}': {}", endpoint, e))
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| {
            SparkError::Configuration(format!("endpoint URL '{}' has no host", endpoint))
        })?
        .to_string();

    let date = httpdate::fmt_http_date(now);
    let canonical = format!("host: {}\ndate: {}\nGET {} HTTP/1.1", host, date, url.path());

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| SparkError::Configuration(format!("invalid api_secret: {}", e)))?;
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{}\",algorithm=\"hmac-sha256\",headers=\"host date request-line\",signature=\"{}\"",
        api_key, signature
    );
    let authorization = BASE64.encode(authorization_origin.as_bytes());

    let mut base = url;
    base.set_query(None);
    base.set_fragment(None);
    Ok(format!(
        "{}?authorization={}&date={}&host={}",
        base,
        urlencoding::encode(&authorization),
        urlencoding::encode(&date),
        host
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const ENDPOINT: &str = "wss://spark-api.xf-yun.com/v1.1/chat";

    fn query_param(signed: &str, name: &str) -> String {
        let url = Url::parse(signed).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| panic!("missing query parameter '{}'", name))
    }

    #[test]
    fn test_signing_is_deterministic_in_time() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = signed_url("key", "secret", ENDPOINT, now).unwrap();
        let b = signed_url("key", "secret", ENDPOINT, now).unwrap();
        assert_eq!(a, b);

        let later = now + Duration::from_secs(1);
        let c = signed_url("key", "secret", ENDPOINT, later).unwrap();
        assert_ne!(query_param(&a, "date"), query_param(&c, "date"));
        assert_ne!(
            query_param(&a, "authorization"),
            query_param(&c, "authorization")
        );
    }

    #[test]
    fn test_signed_url_shape() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let signed = signed_url("my-key", "my-secret", ENDPOINT, now).unwrap();
        assert!(signed.starts_with("wss://spark-api.xf-yun.com/v1.1/chat?authorization="));

        assert_eq!(query_param(&signed, "host"), "spark-api.xf-yun.com");
        assert_eq!(query_param(&signed, "date"), httpdate::fmt_http_date(now));

        // The authorization parameter decodes to the header-style value
        let decoded = BASE64
            .decode(query_param(&signed, "authorization"))
            .unwrap();
        let decoded = String::from_utf8(decoded).unwrap();
        assert!(decoded.starts_with("api_key=\"my-key\",algorithm=\"hmac-sha256\""));
        assert!(decoded.contains("headers=\"host date request-line\""));
        assert!(decoded.contains("signature=\""));
    }

    #[test]
    fn test_empty_credentials_are_rejected() {
        let now = SystemTime::now();
        assert!(matches!(
            signed_url("", "secret", ENDPOINT, now),
            Err(SparkError::Configuration(_))
        ));
        assert!(matches!(
            signed_url("key", "", ENDPOINT, now),
            Err(SparkError::Configuration(_))
        ));
        assert!(matches!(
            signed_url("key", "secret", "not a url", now),
            Err(SparkError::Configuration(_))
        ));
    }
}
