// Data models for the resource services

pub mod instance;
pub mod key;
pub mod snapshot;
pub mod tenant;

use serde::{Deserialize, Serialize};

pub use instance::{CreateInstanceRequest, Instance, InstanceState, UpdateInstanceRequest};
pub use key::{CreateKeyRequest, EncryptionKey, KeyState};
pub use snapshot::{CreateSnapshotRequest, RestoreSnapshotRequest, Snapshot, SnapshotState};
pub use tenant::{CreateTenantRequest, Tenant};

/// Paged list envelope shared by every list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
