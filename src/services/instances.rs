use std::time::Duration;

use crate::error::ClientError;
use crate::models::{CreateInstanceRequest, Instance, ListResponse, UpdateInstanceRequest};
use crate::scope::OperationScope;
use crate::validation::{validate_instance_id, validate_tenant_id};

use super::ServiceContext;

/// Database instance operations, scoped to a tenant
#[derive(Clone)]
pub struct InstanceService {
    ctx: ServiceContext,
}

impl InstanceService {
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
        Ok(format!("/tenants/{}/instances", tenant_id))
    }

    fn member(tenant_id: &str, instance_id: &str) -> Result<String, ClientError> {
        let collection = Self::collection(tenant_id)?;
        validate_instance_id(instance_id)?;
        Ok(format!("{}/{}", collection, instance_id))
    }

    pub async fn list(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
    ) -> Result<ListResponse<Instance>, ClientError> {
        let path = Self::collection(tenant_id)?;
        self.ctx.get(scope, &path).await
    }

    pub async fn get(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
    ) -> Result<Instance, ClientError> {
        let path = Self::member(tenant_id, instance_id)?;
        self.ctx.get(scope, &path).await
    }

    pub async fn create(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        request: &CreateInstanceRequest,
    ) -> Result<Instance, ClientError> {
        if request.name.trim().is_empty() {
            return Err(ClientError::Validation(
                "instance name must not be empty".to_string(),
            ));
        }
        let path = Self::collection(tenant_id)?;
        self.ctx.post(scope, &path, request).await
    }

    pub async fn update(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        request: &UpdateInstanceRequest,
    ) -> Result<Instance, ClientError> {
        let path = Self::member(tenant_id, instance_id)?;
        self.ctx
            .call(scope, reqwest::Method::PATCH, &path, Some(request))
            .await
    }

    pub async fn delete(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
    ) -> Result<(), ClientError> {
        let path = Self::member(tenant_id, instance_id)?;
        self.ctx.delete(scope, &path).await
    }

    /// Stop compute while keeping storage
    pub async fn pause(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
    ) -> Result<Instance, ClientError> {
        let path = format!("{}:pause", Self::member(tenant_id, instance_id)?);
        self.ctx.post(scope, &path, &serde_json::json!({})).await
    }

    pub async fn resume(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
    ) -> Result<Instance, ClientError> {
        let path = format!("{}:resume", Self::member(tenant_id, instance_id)?);
        self.ctx.post(scope, &path, &serde_json::json!({})).await
    }
}
