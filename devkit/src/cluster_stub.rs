/*!
Stub du cluster Proxmox pour tests sans API réelle

Simule les endpoints utilisés par le locator (nodes, qemu, config, status)
et enregistre chaque appel pour les assertions.
*/

use governor_hook::cluster::{
    ClusterApi, ClusterError, NodeEntry, VmEntry, VmRuntimeConfig, VmStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct MockVm {
    pub vm_id: u32,
    pub affinity: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct MockNode {
    pub name: String,
    pub status: String,
    pub vms: Vec<MockVm>,
}

#[derive(Debug, Default)]
struct ClusterState {
    nodes: Vec<MockNode>,
    calls: Vec<String>,
    failures: HashMap<String, u16>,
}

/// Cluster en mémoire, partagé entre clones (comme un client réel)
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un node (builder)
    pub fn with_node(self, name: &str, status: &str) -> Self {
        self.state.lock().unwrap().nodes.push(MockNode {
            name: name.to_string(),
            status: status.to_string(),
            vms: Vec::new(),
        });
        self
    }

    /// Ajoute une VM sur un node existant (builder)
    pub fn with_vm(self, node: &str, vm_id: u32, affinity: Option<&str>, status: &str) -> Self {
        self.add_vm(node, vm_id, affinity, status);
        self
    }

    pub fn add_vm(&self, node: &str, vm_id: u32, affinity: Option<&str>, status: &str) {
        let mut state = self.state.lock().unwrap();
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.name == node)
            .unwrap_or_else(|| panic!("[MOCK] unknown node {}", node));
        node.vms.push(MockVm {
            vm_id,
            affinity: affinity.map(String::from),
            status: status.to_string(),
        });
        log::debug!("🖥️ [MOCK] VM {} added on {}", vm_id, node.name);
    }

    /// Déplace une VM vers un autre node (migration / HA)
    pub fn migrate_vm(&self, vm_id: u32, target: &str) {
        let mut state = self.state.lock().unwrap();
        let mut moved = None;
        for node in state.nodes.iter_mut() {
            if let Some(pos) = node.vms.iter().position(|vm| vm.vm_id == vm_id) {
                moved = Some(node.vms.remove(pos));
            }
        }
        let vm = moved.unwrap_or_else(|| panic!("[MOCK] unknown VM {}", vm_id));
        state
            .nodes
            .iter_mut()
            .find(|n| n.name == target)
            .unwrap_or_else(|| panic!("[MOCK] unknown node {}", target))
            .vms
            .push(vm);
        log::info!("🚚 [MOCK] VM {} migrated to {}", vm_id, target);
    }

    pub fn set_vm_status(&self, vm_id: u32, status: &str) {
        let mut state = self.state.lock().unwrap();
        for vm in state.nodes.iter_mut().flat_map(|n| n.vms.iter_mut()) {
            if vm.vm_id == vm_id {
                vm.status = status.to_string();
            }
        }
    }

    pub fn set_node_status(&self, node: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(n) = state.nodes.iter_mut().find(|n| n.name == node) {
            n.status = status.to_string();
        }
    }

    /// Fait répondre un chemin d'API avec un statut HTTP d'erreur
    pub fn fail_path(&self, path: &str, status: u16) {
        self.state.lock().unwrap().failures.insert(path.to_string(), status);
    }

    /// Chemins appelés, dans l'ordre (pour assertions de tests)
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, path: String) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(path.clone());
        match state.failures.get(&path) {
            Some(&(401 | 403)) => {
                Err(ClusterError::AuthFailed(format!("ticket rejected on {}", path)))
            }
            Some(&status) => Err(ClusterError::Api { status, path }),
            None => Ok(()),
        }
    }

    fn find_vm(&self, node: &str, vm_id: u32) -> Result<MockVm, ClusterError> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|n| n.name == node)
            .and_then(|n| n.vms.iter().find(|vm| vm.vm_id == vm_id))
            .cloned()
            // PVE answers 500 "does not exist" for a VM on the wrong node
            .ok_or(ClusterError::Api {
                status: 500,
                path: format!("/nodes/{}/qemu/{}", node, vm_id),
            })
    }
}

impl ClusterApi for MockCluster {
    async fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError> {
        self.record("/nodes".to_string())?;
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .iter()
            .map(|n| NodeEntry {
                node: n.name.clone(),
                status: n.status.clone(),
            })
            .collect())
    }

    async fn node_vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError> {
        self.record(format!("/nodes/{}/qemu", node))?;
        let state = self.state.lock().unwrap();
        let node = state.nodes.iter().find(|n| n.name == node).ok_or(ClusterError::Api {
            status: 595,
            path: format!("/nodes/{}/qemu", node),
        })?;
        Ok(node
            .vms
            .iter()
            .map(|vm| VmEntry {
                vmid: vm.vm_id,
                status: Some(vm.status.clone()),
                name: None,
            })
            .collect())
    }

    async fn vm_config(&self, node: &str, vm_id: u32) -> Result<VmRuntimeConfig, ClusterError> {
        self.record(format!("/nodes/{}/qemu/{}/config", node, vm_id))?;
        let vm = self.find_vm(node, vm_id)?;
        let mut other = HashMap::new();
        other.insert("vmid".to_string(), serde_json::json!(vm_id));
        Ok(VmRuntimeConfig {
            affinity: vm.affinity,
            other,
        })
    }

    async fn vm_status(&self, node: &str, vm_id: u32) -> Result<VmStatus, ClusterError> {
        self.record(format!("/nodes/{}/qemu/{}/status/current", node, vm_id))?;
        let vm = self.find_vm(node, vm_id)?;
        Ok(VmStatus { status: vm.status })
    }
}
