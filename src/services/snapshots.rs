use std::time::Duration;

use crate::error::ClientError;
use crate::models::{CreateSnapshotRequest, Instance, ListResponse, RestoreSnapshotRequest, Snapshot};
use crate::scope::OperationScope;
use crate::validation::{validate_date, validate_instance_id, validate_tenant_id, validate_uuid};

use super::ServiceContext;

/// Snapshot operations, scoped to an instance
#[derive(Clone)]
pub struct SnapshotService {
    ctx: ServiceContext,
}

impl SnapshotService {
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

    fn collection(tenant_id: &str, instance_id: &str) -> Result<String, ClientError> {
        validate_tenant_id(tenant_id)?;
        validate_instance_id(instance_id)?;
        Ok(format!(
            "/tenants/{}/instances/{}/snapshots",
            tenant_id, instance_id
        ))
    }

    fn member(tenant_id: &str, instance_id: &str, snapshot_id: &str) -> Result<String, ClientError> {
        let collection = Self::collection(tenant_id, instance_id)?;
        validate_uuid("snapshot id", snapshot_id)?;
        Ok(format!("{}/{}", collection, snapshot_id))
    }

    /// List snapshots, optionally only those created on or after `created_after` (YYYY-MM-DD)
    pub async fn list(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        created_after: Option<&str>,
    ) -> Result<ListResponse<Snapshot>, ClientError> {
        let mut path = Self::collection(tenant_id, instance_id)?;
        if let Some(date) = created_after {
            let date = validate_date(date)?;
            path = format!("{}?createdAfter={}", path, date.format("%Y-%m-%d"));
        }
        self.ctx.get(scope, &path).await
    }

    pub async fn get(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        snapshot_id: &str,
    ) -> Result<Snapshot, ClientError> {
        let path = Self::member(tenant_id, instance_id, snapshot_id)?;
        self.ctx.get(scope, &path).await
    }

    pub async fn create(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        request: &CreateSnapshotRequest,
    ) -> Result<Snapshot, ClientError> {
        let path = Self::collection(tenant_id, instance_id)?;
        self.ctx.post(scope, &path, request).await
    }

    pub async fn delete(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        snapshot_id: &str,
    ) -> Result<(), ClientError> {
        let path = Self::member(tenant_id, instance_id, snapshot_id)?;
        self.ctx.delete(scope, &path).await
    }

    /// Restore into a new instance; returns the instance being created
    pub async fn restore(
        &self,
        scope: &OperationScope,
        tenant_id: &str,
        instance_id: &str,
        snapshot_id: &str,
        request: &RestoreSnapshotRequest,
    ) -> Result<Instance, ClientError> {
        let path = format!("{}:restore", Self::member(tenant_id, instance_id, snapshot_id)?);
        self.ctx.post(scope, &path, request).await
    }
}
