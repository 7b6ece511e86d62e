//! Shapes of the Proxmox VE API responses used by the hook

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Every API answer is wrapped as `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Entry of `GET /nodes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub node: String,
    /// online, offline, unknown
    #[serde(default)]
    pub status: String,
}

impl NodeEntry {
    pub fn is_offline(&self) -> bool {
        self.status == "offline"
    }
}

/// Entry of `GET /nodes/{node}/qemu`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmEntry {
    #[serde(deserialize_with = "vmid_from_int_or_str")]
    pub vmid: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Answer of `GET /nodes/{node}/qemu/{vmid}/config`.
///
/// Only the affinity is interpreted, the rest is kept as returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmRuntimeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Answer of `GET /nodes/{node}/qemu/{vmid}/status/current`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmStatus {
    /// running, stopped, paused...
    pub status: String,
}

impl VmStatus {
    pub fn is_stopped(&self) -> bool {
        self.status == "stopped"
    }
}

/// A VM id and the node currently hosting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLocation {
    pub node: String,
    pub vm_id: u32,
}

// Some PVE versions send vmid as a string in listings
fn vmid_from_int_or_str<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrStr {
        Int(u32),
        Str(String),
    }

    match IntOrStr::deserialize(deserializer)? {
        IntOrStr::Int(id) => Ok(id),
        IntOrStr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
