//! Cluster side of the hook
//!
//! - `client`: Proxmox VE REST client (ticket auth, `{data}` envelopes)
//! - `locator`: finds which node hosts a VM and reads its affinity
//! - `types`: API response shapes

pub mod client;
pub mod locator;
pub mod types;

pub use client::ProxmoxClient;
pub use locator::VmLocator;
pub use types::{ClusterLocation, NodeEntry, VmEntry, VmRuntimeConfig, VmStatus};

use crate::affinity::AffinityError;

/// Errors raised while talking to the cluster or reading its answers
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Cluster API unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("Cluster authentication failed: {0}")]
    AuthFailed(String),
    #[error("Cluster API returned {status} for {path}")]
    Api { status: u16, path: String },
    #[error("Unexpected cluster API answer for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("VM {0} not found on any online node")]
    VmNotFound(u32),
    #[error("VM {vm_id} has an invalid affinity: {source}")]
    InvalidAffinity {
        vm_id: u32,
        #[source]
        source: AffinityError,
    },
}

/// Operations the locator needs from the cluster management API
#[allow(async_fn_in_trait)]
pub trait ClusterApi {
    /// All cluster nodes with their status
    async fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError>;

    /// VMs currently hosted by a node
    async fn node_vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError>;

    /// Configuration of a VM on a node
    async fn vm_config(&self, node: &str, vm_id: u32) -> Result<VmRuntimeConfig, ClusterError>;

    /// Live run status of a VM on a node
    async fn vm_status(&self, node: &str, vm_id: u32) -> Result<VmStatus, ClusterError>;
}
