// Request pipeline: token acquisition, headers, transport call, classification

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::auth::{TokenManager, TokenRecord};
use crate::error::{ApiError, ClientError, TransportError};
use crate::scope::OperationScope;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Fixed client identifier sent as User-Agent on every request
pub const CLIENT_IDENTIFIER: &str = concat!("cloudapi-client-rust/", env!("CARGO_PKG_VERSION"));

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Executes one logical API operation per call
///
/// Cheap to clone; clones share the transport and the token manager.
#[derive(Clone)]
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenManager>,
    span: tracing::Span,
}

impl RequestPipeline {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<TokenManager>) -> Self {
        Self {
            transport,
            tokens,
            span: tracing::Span::none(),
        }
    }

    /// Record pipeline work under `span`
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Execute one request and decode the success body into `T`
    ///
    /// Returns `Cancelled`/`DeadlineExceeded` as soon as `scope` ends, including
    /// while the transport call is in flight. Non-success statuses become
    /// `ClientError::Api`; undecodable success bodies become `ClientError::Decode`.
    /// An empty success body decodes as JSON `null`, which suits `()` and `Option`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        scope: &OperationScope,
        method: Method,
        path: &str,
        content_type: &str,
        body: Option<Bytes>,
    ) -> Result<T, ClientError> {
        let span = tracing::debug_span!(parent: &self.span, "api_request", method = %method, path = %path);

        async move {
            let response = self.send(scope, method, path, content_type, body).await?;
            decode_body(&response.body)
        }
        .instrument(span)
        .await
    }

    /// Serialize `body` as JSON and execute
    pub async fn execute_json<B, T>(
        &self,
        scope: &OperationScope,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(|b| serde_json::to_vec(b).map(Bytes::from))
            .transpose()
            .map_err(|e| ClientError::Validation(format!("Failed to encode request body: {}", e)))?;

        self.execute(scope, method, path, JSON_CONTENT_TYPE, body)
            .await
    }

    async fn send(
        &self,
        scope: &OperationScope,
        method: Method,
        path: &str,
        content_type: &str,
        body: Option<Bytes>,
    ) -> Result<TransportResponse, ClientError> {
        // Released when this call returns, whichever way it returns
        let scope = scope.child();

        scope.check()?;

        let token = self.tokens.ensure_valid_token(&scope).await?;

        let request = TransportRequest {
            method,
            path: path.to_string(),
            headers: build_headers(content_type, &token)?,
            body,
        };

        tracing::debug!("Sending API request");

        let response = scope.run(self.transport.send(&scope, request)).await??;

        if !response.is_success() {
            let err = ApiError::from_response(response.status.as_u16(), &response.body);
            tracing::warn!(
                status = err.status,
                message = %err.message,
                details = err.details.len(),
                "API request rejected"
            );
            return Err(err.into());
        }

        tracing::debug!(status = response.status.as_u16(), "API request succeeded");
        Ok(response)
    }
}

/// Content type, client identifier and authorization headers
pub fn build_headers(content_type: &str, token: &TokenRecord) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    let content_type = HeaderValue::from_str(content_type)
        .map_err(|e| ClientError::Validation(format!("Invalid content type: {}", e)))?;
    let mut authorization = HeaderValue::from_str(&token.authorization())
        .map_err(|e| TransportError::InvalidRequest(format!("Invalid access token: {}", e)))?;
    authorization.set_sensitive(true);

    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_IDENTIFIER));
    headers.insert(AUTHORIZATION, authorization);

    Ok(headers)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };

    serde_json::from_slice(body).map_err(ClientError::Decode)
}
