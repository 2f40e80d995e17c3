use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::error::{ClientError, TransportError};
use crate::scope::OperationScope;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// reqwest-backed transport with retry logic
pub struct HttpTransport {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base URL that relative request paths are joined onto
    base_url: String,

    /// Maximum number of retries
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(
        base_url: impl Into<String>,
        max_connections: usize,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
            base_delay_ms: 1000, // 1 second base delay
        })
    }

    /// Override the backoff base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a relative path onto the base URL; absolute URLs pass through
    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        // Exponential backoff: base_delay * 2^attempt
        // With jitter to avoid thundering herd
        let delay = self.base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
        let jitter = (delay as f64 * 0.1 * rand::random()) as u64;
        delay.saturating_add(jitter)
    }

    /// Sleep before the next attempt, unless the scope ends first
    async fn backoff(&self, scope: &OperationScope, attempt: u32) -> Result<(), TransportError> {
        let delay = self.calculate_backoff_delay(attempt);
        scope
            .run(tokio::time::sleep(Duration::from_millis(delay)))
            .await?;
        Ok(())
    }

    /// One network exchange, body fully read
    async fn execute_once(
        &self,
        scope: &OperationScope,
        url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        if let Some(remaining) = scope.remaining() {
            builder = builder.timeout(remaining);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(TransportResponse { status, body })
    }
}

/// Statuses worth another attempt
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Categorize a reqwest error for logging and classification
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Automatically retries connection failures, 429 and 5xx with
    /// exponential backoff. Every attempt and every backoff sleep stops
    /// when the scope ends.
    async fn send(
        &self,
        scope: &OperationScope,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(&request.path);
        let method = request.method.clone();
        let mut attempt = 0;

        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        loop {
            tracing::debug!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                "Executing request attempt"
            );

            let result = scope.run(self.execute_once(scope, &url, &request)).await?;

            match result {
                Ok(response) => {
                    let status = response.status;

                    tracing::debug!(
                        status = %status,
                        "Received HTTP response"
                    );

                    if is_retryable_status(status) && attempt < self.max_retries {
                        tracing::warn!(
                            "Received {}, retrying after backoff (attempt {}/{})",
                            status,
                            attempt + 1,
                            self.max_retries
                        );

                        self.backoff(scope, attempt).await?;
                        attempt += 1;
                        continue;
                    }

                    return Ok(response);
                }

                Err(e) => {
                    // A per-attempt timeout derived from the scope deadline
                    scope.check()?;

                    let kind = error_kind(&e);

                    tracing::warn!(
                        error_kind = kind,
                        error = %e,
                        url = %url,
                        attempt = attempt + 1,
                        "HTTP request error"
                    );

                    if attempt < self.max_retries {
                        self.backoff(scope, attempt).await?;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error_kind = kind,
                        error = %e,
                        url = %url,
                        total_attempts = attempt + 1,
                        "HTTP request failed after all retries"
                    );

                    return Err(TransportError::Http {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

// Simple random number generation for jitter
mod rand {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hash, Hasher};

    pub fn random() -> f64 {
        let state = RandomState::new();
        let mut hasher = state.build_hasher();
        std::time::SystemTime::now().hash(&mut hasher);
        (hasher.finish() % 1000) as f64 / 1000.0
    }
}
