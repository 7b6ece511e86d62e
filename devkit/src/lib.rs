/*!
# Governor Hook DevKit - Stubs et Utilitaires pour les tests

Bibliothèque facilitant les tests du hook sans cluster ni sysfs réels:
- Stub du cluster Proxmox (nodes, VMs, configs, statuts)
- Governor enregistreur (écritures en mémoire, pannes simulées)
- Arborescence sysfs temporaire
- Harness reliant le tout au dispatcher
*/

pub mod cluster_stub;
pub mod governor_stub;
pub mod sysfs;
pub mod test_utils;

pub use cluster_stub::MockCluster;
pub use governor_stub::{GovernorWrite, RecordingGovernor};
pub use sysfs::FakeSysfs;
pub use test_utils::TestHarness;
