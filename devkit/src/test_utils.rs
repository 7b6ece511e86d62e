/*!
Test Harness pour le hook

Relie un cluster simulé et un governor enregistreur au dispatcher:
- Setup automatique des stubs
- Exécution d'une phase comme le ferait `qm`
- Assertions sur les écritures de governor
*/

use crate::cluster_stub::MockCluster;
use crate::governor_stub::{GovernorWrite, RecordingGovernor};
use anyhow::Result;
use governor_hook::governor::GovernorState;
use governor_hook::lifecycle::{self, LifecycleError, Phase, TransitionReport};
use governor_hook::{HookConfig, VmLocator};

/// Config de test, identifiants factices
pub fn test_config() -> HookConfig {
    HookConfig {
        user: "root@pam".to_string(),
        password: "test".to_string(),
        started_state: GovernorState::Performance,
        stopped_state: GovernorState::Schedutil,
        hostname: "localhost".to_string(),
        verify_tls: false,
    }
}

pub struct TestHarness {
    pub cluster: MockCluster,
    pub governor: RecordingGovernor,
    pub config: HookConfig,
    locator: VmLocator<MockCluster>,
}

impl TestHarness {
    /// Harness sur un cluster vide et 16 coeurs en schedutil
    pub fn new() -> Self {
        Self::with_cluster(MockCluster::new())
    }

    pub fn with_cluster(cluster: MockCluster) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        Self {
            locator: VmLocator::new(cluster.clone()),
            cluster,
            governor: RecordingGovernor::with_cores(16, GovernorState::Schedutil),
            config: test_config(),
        }
    }

    pub fn with_states(mut self, started: GovernorState, stopped: GovernorState) -> Self {
        self.config.started_state = started;
        self.config.stopped_state = stopped;
        self
    }

    pub fn locator(&self) -> &VmLocator<MockCluster> {
        &self.locator
    }

    /// Exécute une phase comme le ferait `qm` (`<vmid> <phase>`)
    pub async fn run(
        &self,
        phase: &str,
        vm_id: u32,
    ) -> Result<Option<TransitionReport>, LifecycleError> {
        log::info!("▶️ Running phase {} for VM {}", phase, vm_id);
        let phase = Phase::from(phase);
        lifecycle::dispatch(&phase, &self.config, &self.locator, &self.governor, vm_id).await
    }

    pub async fn start(&self, vm_id: u32) -> Result<TransitionReport, LifecycleError> {
        lifecycle::on_start(&self.config, &self.locator, &self.governor, vm_id).await
    }

    pub async fn stop(&self, vm_id: u32) -> Result<TransitionReport, LifecycleError> {
        lifecycle::on_stop(&self.config, &self.locator, &self.governor, vm_id).await
    }

    /// Assert que les écritures correspondent exactement, dans l'ordre
    pub fn assert_writes(&self, expected: &[(u32, GovernorState)]) -> Result<()> {
        let actual = self.governor.writes();
        let expected: Vec<GovernorWrite> = expected
            .iter()
            .map(|&(core, state)| GovernorWrite { core, state })
            .collect();

        if actual != expected {
            anyhow::bail!("Governor writes mismatch: expected {:?}, got {:?}", expected, actual);
        }
        log::info!("✅ {} governor write(s) as expected", actual.len());
        Ok(())
    }

    /// Reset les écritures et appels enregistrés
    pub fn reset(&self) {
        self.governor.clear();
        self.cluster.clear_calls();
        log::info!("🧹 Test harness reset");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
