//! Governor Hook - Proxmox VE hookscript for per-VM CPU governors
//!
//! Switches the cpufreq governor of the cores a VM is pinned to:
//! - Locates the VM in the cluster through the Proxmox API
//! - Parses its CPU affinity list
//! - Writes the configured governor to each core on `pre-start` and `post-stop`

pub mod affinity;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod governor;
pub mod lifecycle;

pub use cluster::{ClusterApi, ClusterError, ProxmoxClient, VmLocator};
pub use config::{ConfigError, HookConfig};
pub use governor::{GovernorControl, GovernorError, GovernorState, SysfsGovernor};
pub use lifecycle::{LifecycleError, Phase, TransitionReport};
