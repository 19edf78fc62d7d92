//! `HttpTransport` - shared HTTP primitive used by every provider.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;
use url::Url;

use crate::error::EpgError;
use crate::model::DEFAULT_TIMEOUT;
use crate::throttle::RequestThrottle;

/// Default User-Agent.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// POST-with-headers transport bound to one provider.
///
/// No retries: transport failures are surfaced to the caller as
/// [`EpgError::Transport`] and retry policy is left to it.
#[derive(Debug)]
pub struct HttpTransport {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
    /// Base URL request paths are joined onto (path always ends in `/`).
    base_url: Url,
    /// Provider ID attached to every error.
    provider: String,
    /// Request throttle.
    throttle: Arc<Mutex<RequestThrottle>>,
}

/// Builder for `HttpTransport`.
#[derive(Debug)]
pub struct HttpTransportBuilder {
    provider: String,
    base_url: Option<Url>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    min_interval: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the User-Agent (default: [`DEFAULT_USER_AGENT`]).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the per-request timeout (default: 30s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the minimum request interval (default: none).
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// - `base_url` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<HttpTransport> {
        let mut base_url = self
            .base_url
            .with_context(|| format!("base_url is required for provider {}", self.provider))?;
        // A path prefix (e.g. a gateway mount) must survive `Url::join`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        let throttle = RequestThrottle::new(self.min_interval.unwrap_or(Duration::ZERO));

        Ok(HttpTransport {
            http_client,
            base_url,
            provider: self.provider,
            throttle: Arc::new(Mutex::new(throttle)),
        })
    }
}

impl HttpTransport {
    /// Creates a new builder for the given provider.
    #[must_use]
    pub fn builder(provider: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder {
            provider: provider.into(),
            base_url: None,
            user_agent: None,
            timeout: None,
            min_interval: None,
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends `body` as JSON to `path` and returns the raw response bytes.
    ///
    /// `path` is resolved below the base URL's path, with or without a
    /// leading `/`.
    ///
    /// `headers` are added on top of the client defaults (User-Agent,
    /// `Content-Type: application/json`).
    ///
    /// # Errors
    ///
    /// - [`EpgError::InvalidUrl`] if `path` cannot be joined onto the base URL.
    /// - [`EpgError::RequestEncode`] if `body` cannot be serialized.
    /// - [`EpgError::Transport`] on network failure or timeout.
    /// - [`EpgError::HttpStatus`] on a non-2xx response.
    #[instrument(skip_all, fields(provider = %self.provider, path = path))]
    pub async fn post_json<B>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<Vec<u8>, EpgError>
    where
        B: Serialize + ?Sized,
    {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| EpgError::InvalidUrl {
                provider: self.provider.clone(),
                source,
            })?;
        let payload = serde_json::to_vec(body).map_err(|source| EpgError::RequestEncode {
            provider: self.provider.clone(),
            source,
        })?;

        let request_no = {
            let mut throttle = self.throttle.lock().await;
            throttle.wait().await;
            throttle.issued()
        };

        let mut request = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(payload);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        tracing::debug!(request_no, "EPG request");

        let response = request.send().await.map_err(|source| EpgError::Transport {
            provider: self.provider.clone(),
            source,
        })?;

        let status = response.status();
        tracing::trace!(%status, headers = ?response.headers(), "Response headers");
        if !status.is_success() {
            return Err(EpgError::HttpStatus {
                provider: self.provider.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| EpgError::Transport {
            provider: self.provider.clone(),
            source,
        })?;
        tracing::debug!(body_len = bytes.len(), "Response body received");

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn transport_for(server: &wiremock::MockServer) -> HttpTransport {
        HttpTransport::builder("test")
            .base_url(server.uri().parse().unwrap())
            .user_agent("epgsync-test/0.0.0")
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_base_url() {
        // Arrange & Act
        let result = HttpTransport::builder("hebei").build();

        // Assert
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("base_url is required for provider hebei")
        );
    }

    #[test]
    fn test_builder_appends_trailing_slash() {
        // Arrange
        let url = Url::parse("https://gw.example.com/proxy").unwrap();

        // Act
        let transport = HttpTransport::builder("hebei").base_url(url).build().unwrap();

        // Assert
        assert_eq!(transport.base_url().as_str(), "https://gw.example.com/proxy/");
    }

    #[tokio::test]
    async fn test_post_json_keeps_base_path_prefix() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/proxy/api/schedule"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&mock_server)
            .await;
        let transport = HttpTransport::builder("test")
            .base_url(format!("{}/proxy", mock_server.uri()).parse().unwrap())
            .build()
            .unwrap();

        // Act
        let leading = transport
            .post_json("/api/schedule", &[], &serde_json::json!({}))
            .await;
        let relative = transport
            .post_json("api/schedule", &[], &serde_json::json!({}))
            .await;

        // Assert
        assert_eq!(leading.unwrap(), b"{}");
        assert_eq!(relative.unwrap(), b"{}");
    }

    #[test]
    fn test_builder_with_base_url_succeeds() {
        // Arrange
        let url = Url::parse("http://localhost:8080").unwrap();

        // Act
        let transport = HttpTransport::builder("hebei")
            .base_url(url.clone())
            .build()
            .unwrap();

        // Assert
        assert_eq!(transport.base_url(), &url);
    }

    #[tokio::test]
    async fn test_post_json_sends_body_and_headers() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/schedule"))
            .and(wiremock::matchers::header("User-Agent", "epgsync-test/0.0.0"))
            .and(wiremock::matchers::header("X-Tenant", "t-1"))
            .and(wiremock::matchers::body_json(serde_json::json!({"day": "2024-01-10"})))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let transport = transport_for(&mock_server);

        // Act
        let body = transport
            .post_json(
                "/api/schedule",
                &[("X-Tenant", "t-1")],
                &serde_json::json!({"day": "2024-01-10"}),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(body, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_post_json_non_success_status() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;
        let transport = transport_for(&mock_server);

        // Act
        let err = transport
            .post_json("/x", &[], &serde_json::json!({}))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, EpgError::HttpStatus { status: 502, .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_post_json_timeout_is_transport_error() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;
        let transport = transport_for(&mock_server);

        // Act
        let err = transport
            .post_json("/x", &[], &serde_json::json!({}))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, EpgError::Transport { ref provider, .. } if provider == "test"));
    }

    #[tokio::test]
    async fn test_throttle_enforces_interval() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&mock_server)
            .await;
        let transport = HttpTransport::builder("test")
            .base_url(mock_server.uri().parse().unwrap())
            .min_interval(Duration::from_millis(100))
            .build()
            .unwrap();

        // Act
        let start = std::time::Instant::now();
        transport.post_json("/x", &[], &serde_json::json!({})).await.unwrap();
        transport.post_json("/x", &[], &serde_json::json!({})).await.unwrap();
        let elapsed = start.elapsed();

        // Assert: at least 100ms interval between two requests
        assert!(elapsed >= Duration::from_millis(100));
    }
}
