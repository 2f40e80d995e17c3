// Resource services
// Thin callers that derive a per-call scope and go through the request pipeline

mod instances;
mod keys;
mod snapshots;
mod tenants;

pub use instances::InstanceService;
pub use keys::KeyService;
pub use snapshots::SnapshotService;
pub use tenants::TenantService;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::ClientError;
use crate::pipeline::RequestPipeline;
use crate::scope::OperationScope;

/// What every service needs: the pipeline, the API prefix and its timeout
#[derive(Clone)]
pub(crate) struct ServiceContext {
    pipeline: RequestPipeline,
    prefix: String,
    timeout: Duration,
}

impl ServiceContext {
    pub(crate) fn new(pipeline: RequestPipeline, prefix: String, timeout: Duration) -> Self {
        Self {
            pipeline,
            prefix,
            timeout,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    /// Derive `min(caller deadline, service timeout)` and run one request.
    /// The derived scope is dropped on every return path.
    async fn call<B, T>(
        &self,
        scope: &OperationScope,
        method: Method,
        suffix: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let scope = scope.with_timeout(self.timeout);
        self.pipeline
            .execute_json(&scope, method, &self.path(suffix), body)
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        scope: &OperationScope,
        suffix: &str,
    ) -> Result<T, ClientError> {
        self.call::<(), T>(scope, Method::GET, suffix, None).await
    }

    async fn post<B, T>(&self, scope: &OperationScope, suffix: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(scope, Method::POST, suffix, Some(body)).await
    }

    async fn delete(&self, scope: &OperationScope, suffix: &str) -> Result<(), ClientError> {
        self.call::<(), ()>(scope, Method::DELETE, suffix, None).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::auth::{Credentials, TokenManager, TokenRecord};
    use crate::error::TransportError;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::{TransportRequest, TransportResponse};

    /// Service context over a scripted transport with a pre-seeded token
    pub(crate) fn context<F>(handler: F, timeout: Duration) -> (ServiceContext, Arc<ScriptedTransport>)
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        context_with_delay(handler, timeout, Duration::ZERO)
    }

    /// Same, with every response delayed and the delay ignoring scopes
    pub(crate) fn context_with_delay<F>(
        handler: F,
        timeout: Duration,
        delay: Duration,
    ) -> (ServiceContext, Arc<ScriptedTransport>)
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        let transport = Arc::new(
            ScriptedTransport::new(handler)
                .with_delay(delay)
                .ignoring_scope(),
        );
        let now = Utc::now();
        let tokens = Arc::new(
            TokenManager::new(
                Credentials::new("client", "secret"),
                transport.clone(),
                "/oauth/token",
            )
            .with_token(TokenRecord {
                access_token: "svc-token".to_string(),
                token_type: "Bearer".to_string(),
                obtained_at: now,
                expires_at: now + ChronoDuration::hours(1),
            }),
        );
        let pipeline = RequestPipeline::new(transport.clone(), tokens);

        (
            ServiceContext::new(pipeline, "/v1".to_string(), timeout),
            transport,
        )
    }
}
