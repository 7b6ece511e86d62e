//! VM location across the cluster
//!
//! Placement can change between two hook calls (migration, HA), so nothing
//! is cached: every lookup scans the online nodes again.

use super::{ClusterApi, ClusterError, ClusterLocation, VmRuntimeConfig};
use crate::affinity::{self, Affinity};
use tracing::debug;

pub struct VmLocator<C> {
    api: C,
}

impl<C: ClusterApi> VmLocator<C> {
    pub fn new(api: C) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    /// Names of the nodes that are not offline, in API order
    async fn online_nodes(&self) -> Result<Vec<String>, ClusterError> {
        let mut online = Vec::new();
        for node in self.api.nodes().await? {
            if node.is_offline() {
                debug!("Skipping offline node {}", node.node);
                continue;
            }
            online.push(node.node);
        }
        Ok(online)
    }

    /// Every (node, VM id) pair hosted by a node that is not offline
    pub async fn locations(&self) -> Result<Vec<ClusterLocation>, ClusterError> {
        let mut locations = Vec::new();
        for node in self.online_nodes().await? {
            for vm in self.api.node_vms(&node).await? {
                locations.push(ClusterLocation {
                    node: node.clone(),
                    vm_id: vm.vmid,
                });
            }
        }
        Ok(locations)
    }

    /// Node hosting the VM, `None` when no online node lists it.
    ///
    /// Stops at the first node that lists the VM.
    pub async fn find_node(&self, vm_id: u32) -> Result<Option<String>, ClusterError> {
        for node in self.online_nodes().await? {
            let vms = self.api.node_vms(&node).await?;
            if vms.iter().any(|vm| vm.vmid == vm_id) {
                debug!("VM {} found on node {}", vm_id, node);
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Node hosting the VM, `VmNotFound` when no online node lists it
    pub async fn resolve_node(&self, vm_id: u32) -> Result<String, ClusterError> {
        self.find_node(vm_id)
            .await?
            .ok_or(ClusterError::VmNotFound(vm_id))
    }

    /// Configuration of the VM, fetched from the node hosting it
    pub async fn config(&self, vm_id: u32) -> Result<VmRuntimeConfig, ClusterError> {
        let node = self.resolve_node(vm_id).await?;
        self.api.vm_config(&node, vm_id).await
    }

    /// Cores the VM is pinned to, empty when no affinity is configured
    pub async fn affinities(&self, vm_id: u32) -> Result<Affinity, ClusterError> {
        let config = self.config(vm_id).await?;
        affinity::parse_optional(config.affinity.as_deref())
            .map_err(|source| ClusterError::InvalidAffinity { vm_id, source })
    }

    /// A VM no node reports is treated as stopped
    pub async fn is_stopped(&self, vm_id: u32) -> Result<bool, ClusterError> {
        let Some(node) = self.find_node(vm_id).await? else {
            return Ok(true);
        };
        let status = self.api.vm_status(&node, vm_id).await?;
        Ok(status.is_stopped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{NodeEntry, VmEntry, VmStatus};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal cluster: node -> (status, [(vmid, config, status)])
    #[derive(Default)]
    struct StubCluster {
        nodes: Vec<(String, String, Vec<(u32, Option<String>, String)>)>,
        listed: Mutex<Vec<String>>,
    }

    impl StubCluster {
        fn node(mut self, name: &str, status: &str, vms: &[(u32, Option<&str>, &str)]) -> Self {
            let vms = vms
                .iter()
                .map(|(id, affinity, status)| (*id, affinity.map(String::from), status.to_string()))
                .collect();
            self.nodes.push((name.to_string(), status.to_string(), vms));
            self
        }

        fn vm(&self, node: &str, vm_id: u32) -> Option<&(u32, Option<String>, String)> {
            self.nodes
                .iter()
                .find(|(name, _, _)| name == node)
                .and_then(|(_, _, vms)| vms.iter().find(|(id, _, _)| *id == vm_id))
        }
    }

    impl ClusterApi for StubCluster {
        async fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError> {
            Ok(self
                .nodes
                .iter()
                .map(|(node, status, _)| NodeEntry { node: node.clone(), status: status.clone() })
                .collect())
        }

        async fn node_vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError> {
            self.listed.lock().unwrap().push(node.to_string());
            let (_, _, vms) = self
                .nodes
                .iter()
                .find(|(name, _, _)| name == node)
                .ok_or(ClusterError::Api { status: 500, path: format!("/nodes/{}/qemu", node) })?;
            Ok(vms
                .iter()
                .map(|(vmid, _, _)| VmEntry { vmid: *vmid, status: None, name: None })
                .collect())
        }

        async fn vm_config(&self, node: &str, vm_id: u32) -> Result<VmRuntimeConfig, ClusterError> {
            let (_, affinity, _) = self.vm(node, vm_id).ok_or(ClusterError::VmNotFound(vm_id))?;
            Ok(VmRuntimeConfig { affinity: affinity.clone(), other: HashMap::new() })
        }

        async fn vm_status(&self, node: &str, vm_id: u32) -> Result<VmStatus, ClusterError> {
            let (_, _, status) = self.vm(node, vm_id).ok_or(ClusterError::VmNotFound(vm_id))?;
            Ok(VmStatus { status: status.clone() })
        }
    }

    fn cluster() -> StubCluster {
        StubCluster::default()
            .node("pve1", "online", &[(100, Some("0,2-4"), "running"), (101, None, "stopped")])
            .node("pve2", "offline", &[(200, Some("1"), "running")])
            .node("pve3", "online", &[(300, Some("4-6"), "paused")])
    }

    #[tokio::test]
    async fn test_locations_skip_offline_nodes() {
        let locator = VmLocator::new(cluster());
        let locations = locator.locations().await.unwrap();
        assert_eq!(
            locations,
            vec![
                ClusterLocation { node: "pve1".into(), vm_id: 100 },
                ClusterLocation { node: "pve1".into(), vm_id: 101 },
                ClusterLocation { node: "pve3".into(), vm_id: 300 },
            ]
        );
        assert_eq!(*locator.api().listed.lock().unwrap(), vec!["pve1", "pve3"]);
    }

    #[tokio::test]
    async fn test_resolve_node() {
        let locator = VmLocator::new(cluster());
        assert_eq!(locator.resolve_node(300).await.unwrap(), "pve3");
        // Hosted by an offline node only
        assert!(matches!(locator.resolve_node(200).await, Err(ClusterError::VmNotFound(200))));
        assert_eq!(locator.find_node(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_node_stops_at_first_match() {
        let locator = VmLocator::new(cluster());
        locator.find_node(100).await.unwrap();
        assert_eq!(*locator.api().listed.lock().unwrap(), vec!["pve1"]);
    }

    #[tokio::test]
    async fn test_find_node_never_lists_offline_nodes() {
        let locator = VmLocator::new(cluster());
        assert_eq!(locator.find_node(200).await.unwrap(), None);
        assert_eq!(*locator.api().listed.lock().unwrap(), vec!["pve1", "pve3"]);
    }

    #[tokio::test]
    async fn test_affinities() {
        let locator = VmLocator::new(cluster());
        let cores = |affinity: Affinity| affinity.cores().collect::<Vec<_>>();
        assert_eq!(cores(locator.affinities(100).await.unwrap()), vec![0, 2, 3]);
        assert!(locator.affinities(101).await.unwrap().is_empty());
        assert_eq!(cores(locator.affinities(300).await.unwrap()), vec![4, 5]);
        assert!(matches!(locator.affinities(999).await, Err(ClusterError::VmNotFound(999))));
    }

    #[tokio::test]
    async fn test_invalid_affinity_reported() {
        let locator = VmLocator::new(
            StubCluster::default().node("pve1", "online", &[(5, Some("0,x"), "running")]),
        );
        assert!(matches!(
            locator.affinities(5).await,
            Err(ClusterError::InvalidAffinity { vm_id: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_is_stopped() {
        let locator = VmLocator::new(cluster());
        assert!(!locator.is_stopped(100).await.unwrap());
        assert!(locator.is_stopped(101).await.unwrap());
        // Only "stopped" counts
        assert!(!locator.is_stopped(300).await.unwrap());
        // Unknown VMs are not running
        assert!(locator.is_stopped(999).await.unwrap());
        assert!(locator.is_stopped(200).await.unwrap());
    }
}
