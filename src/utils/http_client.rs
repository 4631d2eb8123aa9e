use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, header::CONTENT_TYPE};
use tracing::debug;
use url::Url;

use crate::errors::{ApiError, ApiResult};
use crate::utils::url::UrlUtils;

/// A fully built upstream request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// A completed response with its body read to the end.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the upstream reported failure (status >= 400)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Minimal request/response capability the engine fetches through.
///
/// Connection pooling, TLS and redirects are the implementation's business.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform exactly one request and read the full body. Status codes are
    /// returned as-is; only failures to talk to the upstream are errors.
    async fn execute(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

/// Default transport backed by reqwest
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    /// Create a client with a connect timeout, an optional deadline on the
    /// whole request and a user agent.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Option<Duration>,
        user_agent: &str,
    ) -> ApiResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn transport_error(request: &HttpRequest, error: impl ToString) -> ApiError {
        ApiError::Transport {
            method: request.method.to_string(),
            url: UrlUtils::obfuscate_credentials(request.url.as_str()),
            message: UrlUtils::obfuscate_credentials(&error.to_string()),
        }
    }
}

#[async_trait]
impl HttpTransport for StandardHttpClient {
    async fn execute(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        debug!(
            method = %request.method,
            url = %UrlUtils::obfuscate_credentials(request.url.as_str()),
            "Performing upstream request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::transport_error(&request, e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&request, format!("Failed to read response: {e}")))?;

        debug!("Fetched {} bytes of raw content", body.len());

        Ok(HttpResponse {
            status,
            content_type,
            content_length,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_threshold() {
        let ok = HttpResponse {
            status: 204,
            ..Default::default()
        };
        let redirect = HttpResponse {
            status: 399,
            ..Default::default()
        };
        let not_found = HttpResponse {
            status: 404,
            ..Default::default()
        };
        assert!(!ok.is_error());
        assert!(!redirect.is_error());
        assert!(not_found.is_error());
    }

    #[test]
    fn test_client_builds_with_timeouts() {
        let client = StandardHttpClient::new(
            Duration::from_secs(5),
            Some(Duration::from_secs(30)),
            "audio-mirror/test",
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_transport_error_hides_credentials() {
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("https://api.example.com/list?token=abc").unwrap(),
            headers: vec![],
            body: None,
        };
        let error = StandardHttpClient::transport_error(&request, "connection refused");
        let message = error.to_string();
        assert!(message.contains("token=****"));
        assert!(!message.contains("abc"));
    }
}
