use std::time::Duration;

use crate::error::ClientError;
use crate::models::{CreateKeyRequest, EncryptionKey, ListResponse};
use crate::scope::OperationScope;
use crate::validation::{validate_tenant_id, validate_uuid};

use super::ServiceContext;

/// Encryption key operations, scoped to a tenant
#[derive(Clone)]
pub struct KeyService {
    ctx: ServiceContext,
}

impl KeyService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Same service with a different per-call timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            ctx: self.ctx.with_timeout(timeout),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.ctx.timeout()
    }

    fn collection(tenant_id: &str) -> Result<String, ClientError> {
        validate_tenant_id(tenant_id)?;
        Ok(format!("/tenants/{}/keys", tenant_id))
    }

    fn member(tenant_id: &str, key_id: &str) -> Result<String, ClientError> {
        let collection = Self::collection(tenant_id)?;
        validate_uuid("key id", key_id)?;
        Ok(format!("{}/{}", collection, key_id))
    }

    pub async fn list(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
    ) -> Result<ListResponse<EncryptionKey>, ClientError> {
        let path = Self::collection(tenant_id)?;
        self.ctx.get(scope, &path).await
    }

    pub async fn get(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        key_id: &str,
    ) -> Result<EncryptionKey, ClientError> {
        let path = Self::member(tenant_id, key_id)?;
        self.ctx.get(scope, &path).await
    }

    pub async fn create(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        request: &CreateKeyRequest,
    ) -> Result<EncryptionKey, ClientError> {
        let path = Self::collection(tenant_id)?;
        self.ctx.post(scope, &path, request).await
    }

    /// Create a new key version; data keys are re-wrapped server-side
    pub async fn rotate(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        key_id: &str,
    ) -> Result<EncryptionKey, ClientError> {
        let path = format!("{}:rotate", Self::member(tenant_id, key_id)?);
        self.ctx.post(scope, &path, &serde_json::json!({})).await
    }
}
