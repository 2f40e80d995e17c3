// Client wiring: transport, token manager, pipeline and services

use std::sync::Arc;

use crate::auth::{TokenManager, TokenRecord};
use crate::config::{Config, ServiceKind};
use crate::error::ClientError;
use crate::http_client::HttpTransport;
use crate::pipeline::RequestPipeline;
use crate::scope::OperationScope;
use crate::services::{InstanceService, KeyService, ServiceContext, SnapshotService, TenantService};
use crate::transport::Transport;

/// Builds a `CloudClient` from a `Config`
///
/// Every dependency (transport, tracing span) is supplied here; nothing is
/// looked up from process-wide state afterwards.
pub struct ClientBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    span: Option<tracing::Span>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            span: None,
        }
    }

    /// Use a custom transport instead of the default `HttpTransport`
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Span the token manager and pipeline record their work under
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<CloudClient, ClientError> {
        let config = self.config;

        if !config.credentials.is_complete() {
            return Err(ClientError::Config(
                "client id and client secret are required".to_string(),
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                config.base_url.clone(),
                config.http_max_connections,
                config.http_connect_timeout,
                config.http_max_retries,
            )?),
        };

        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("cloudapi_client"));

        let tokens = Arc::new(
            TokenManager::new(
                config.credentials.clone(),
                transport.clone(),
                config.token_path.clone(),
            )
            .with_span(span.clone()),
        );

        let pipeline = RequestPipeline::new(transport, tokens).with_span(span);

        tracing::debug!(
            base_url = %config.base_url,
            api_version = %config.api_version,
            default_timeout = ?config.default_timeout,
            "Cloud API client initialized"
        );

        Ok(CloudClient { pipeline, config })
    }
}

/// Entry point for every resource service
#[derive(Clone)]
pub struct CloudClient {
    pipeline: RequestPipeline,
    config: Config,
}

impl CloudClient {
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Client with the default HTTP transport
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        ClientBuilder::new(config).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// A usable access token, refreshed if necessary
    pub async fn token(&self, scope: &OperationScope) -> Result<Arc<TokenRecord>, ClientError> {
        self.pipeline.token_manager().ensure_valid_token(scope).await
    }

    fn context(&self, kind: ServiceKind) -> ServiceContext {
        ServiceContext::new(
            self.pipeline.clone(),
            self.config.api_prefix(),
            self.config.timeout_for(kind),
        )
    }

    pub fn tenants(&self) -> TenantService {
        TenantService::new(self.context(ServiceKind::Tenants))
    }

    pub fn instances(&self) -> InstanceService {
        InstanceService::new(self.context(ServiceKind::Instances))
    }

    pub fn snapshots(&self) -> SnapshotService {
        SnapshotService::new(self.context(ServiceKind::Snapshots))
    }

    pub fn keys(&self) -> KeyService {
        KeyService::new(self.context(ServiceKind::Keys))
    }
}
