use crate::error::ClientError;
use crate::models::{CreateTenantRequest, ListResponse, Tenant};
use crate::scope::OperationScope;
use crate::validation::validate_tenant_id;

use super::ServiceContext;

/// Tenant operations
#[derive(Clone)]
pub struct TenantService {
    ctx: ServiceContext,
}

impl TenantService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Same service with a different per-call timeout
    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        Self {
            ctx: self.ctx.with_timeout(timeout),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        self.ctx.timeout()
    }

    pub async fn list(&self, scope: &OperationScope) -> Result<ListResponse<Tenant>, ClientError> {
        self.ctx.get(scope, "/tenants").await
    }

    pub async fn get(&self, scope: &OperationScope, tenant_id: &str) -> Result<Tenant, ClientError> {
        validate_tenant_id(tenant_id)?;
        self.ctx.get(scope, &format!("/tenants/{}", tenant_id)).await
    }

    pub async fn create(
        &self,
        scope: &OperationScope,
        request: &CreateTenantRequest,
    ) -> Result<Tenant, ClientError> {
        validate_tenant_id(&request.id)?;
        self.ctx.post(scope, "/tenants", request).await
    }

    pub async fn delete(&self, scope: &OperationScope, tenant_id: &str) -> Result<(), ClientError> {
        validate_tenant_id(tenant_id)?;
        self.ctx.delete(scope, &format!("/tenants/{}", tenant_id)).await
    }
}
