// Transport abstraction: one HTTP exchange per call

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::error::TransportError;
use crate::scope::OperationScope;

/// A single outgoing HTTP exchange
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the API base URL, or an absolute URL
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Raw status and body of a completed exchange
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Performs HTTP exchanges on behalf of the token manager and request pipeline
///
/// Implementations must stop promptly when `scope` is cancelled or its deadline
/// passes, and may retry transient failures internally. Whatever they do, a call
/// yields exactly one outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        scope: &OperationScope,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// Scripted in-memory transport for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    type Handler =
        dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

    /// Answers every request through a closure, after an optional delay,
    /// and records what it was asked to send
    pub struct ScriptedTransport {
        handler: Box<Handler>,
        delay: Duration,
        ignore_scope: bool,
        calls: AtomicUsize,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
                + Send
                + Sync
                + 'static,
        {
            Self {
                handler: Box::new(handler),
                delay: Duration::ZERO,
                ignore_scope: false,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Delay every response
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Sleep through the delay even if the scope ends
        pub fn ignoring_scope(mut self) -> Self {
            self.ignore_scope = true;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Number of recorded requests whose path ends with `suffix`
        pub fn calls_to(&self, suffix: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.path.ends_with(suffix))
                .count()
        }

        pub fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            scope: &OperationScope,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            if !self.delay.is_zero() {
                if self.ignore_scope {
                    tokio::time::sleep(self.delay).await;
                } else {
                    scope.run(tokio::time::sleep(self.delay)).await?;
                }
            }

            (self.handler)(&request)
        }
    }

    /// JSON response with the given status
    pub fn json_response(status: u16, body: serde_json::Value) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from(body.to_string()),
        }
    }

    /// Raw response with the given status
    pub fn raw_response(status: u16, body: &'static str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    /// Successful client-credentials grant response
    pub fn token_response(access_token: &str, expires_in: i64) -> TransportResponse {
        json_response(
            200,
            serde_json::json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": expires_in,
            }),
        )
    }
}
