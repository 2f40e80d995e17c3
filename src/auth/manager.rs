use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Instrument;

use super::credentials::Credentials;
use super::refresh;
use super::types::TokenRecord;
use crate::error::ClientError;
use crate::scope::OperationScope;
use crate::transport::Transport;

/// Token manager
/// Owns the cached token and refreshes it through the transport when needed
///
/// Concurrent callers that find the token stale queue on the write lock; the
/// first one refreshes and the rest see the fresh record on their re-check, so
/// one expiry costs exactly one grant request.
pub struct TokenManager {
    /// Client credentials, read-only
    credentials: Credentials,

    /// Current token, replaced wholesale under the write lock
    record: RwLock<Option<Arc<TokenRecord>>>,

    /// Transport used for the grant request
    transport: Arc<dyn Transport>,

    /// Token endpoint path (or absolute URL)
    token_path: String,

    /// User-Agent sent with grant requests
    user_agent: String,

    /// Span all token work is recorded under
    span: tracing::Span,
}

impl TokenManager {
    /// Create a token manager with an empty cache
    pub fn new(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        token_path: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            record: RwLock::new(None),
            transport,
            token_path: token_path.into(),
            user_agent: crate::pipeline::CLIENT_IDENTIFIER.to_string(),
            span: tracing::Span::none(),
        }
    }

    /// Record token work under `span`
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Seed the cache with a known record
    /// Available in test builds and integration tests
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_token(self, record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(Arc::new(record))),
            ..self
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Peek at the cached record without refreshing
    pub async fn cached_token(&self) -> Option<Arc<TokenRecord>> {
        self.record.read().await.clone()
    }

    /// Return a usable token, refreshing it if necessary
    ///
    /// Lock waits and the grant request both stop when `scope` ends. A failed
    /// refresh leaves the cached record untouched, so the next caller retries.
    pub async fn ensure_valid_token(
        &self,
        scope: &OperationScope,
    ) -> Result<Arc<TokenRecord>, ClientError> {
        self.ensure_valid_token_inner(scope)
            .instrument(self.span.clone())
            .await
    }

    async fn ensure_valid_token_inner(
        &self,
        scope: &OperationScope,
    ) -> Result<Arc<TokenRecord>, ClientError> {
        {
            let current = scope.run(self.record.read()).await?;
            if let Some(record) = current.as_ref().filter(|r| r.is_usable()) {
                return Ok(Arc::clone(record));
            }
        }

        let mut current = scope.run(self.record.write()).await?;

        // Another caller may have refreshed while we waited for the write lock
        if let Some(record) = current.as_ref().filter(|r| r.is_usable()) {
            tracing::debug!("Token refreshed by a concurrent caller, reusing it");
            return Ok(Arc::clone(record));
        }

        let record = refresh::refresh_client_credentials(
            self.transport.as_ref(),
            scope,
            &self.credentials,
            &self.token_path,
            &self.user_agent,
        )
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Token refresh failed"))?;

        let record = Arc::new(record);
        *current = Some(Arc::clone(&record));

        Ok(record)
    }
}
