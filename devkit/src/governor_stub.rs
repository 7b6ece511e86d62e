/*!
Governor enregistreur pour tests sans sysfs

Garde l'état de chaque coeur en mémoire, enregistre toutes les écritures
et peut simuler une panne sur un coeur donné.
*/

use governor_hook::governor::{GovernorControl, GovernorError, GovernorState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorWrite {
    pub core: u32,
    pub state: GovernorState,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    PermissionDenied,
    Missing,
}

#[derive(Debug, Default)]
struct GovernorStateStore {
    cores: HashMap<u32, GovernorState>,
    writes: Vec<GovernorWrite>,
    faults: HashMap<u32, Fault>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingGovernor {
    inner: Arc<Mutex<GovernorStateStore>>,
}

impl RecordingGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crée `count` coeurs (0..count) dans l'état donné
    pub fn with_cores(count: u32, state: GovernorState) -> Self {
        let governor = Self::new();
        {
            let mut inner = governor.inner.lock().unwrap();
            for core in 0..count {
                inner.cores.insert(core, state);
            }
        }
        governor
    }

    /// Les écritures sur ce coeur seront refusées (EACCES)
    pub fn deny_core(&self, core: u32) {
        self.inner.lock().unwrap().faults.insert(core, Fault::PermissionDenied);
    }

    /// Ce coeur disparaît (offline)
    pub fn remove_core(&self, core: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.cores.remove(&core);
        inner.faults.insert(core, Fault::Missing);
    }

    /// Écritures réussies, dans l'ordre
    pub fn writes(&self) -> Vec<GovernorWrite> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn state_of(&self, core: u32) -> Option<GovernorState> {
        self.inner.lock().unwrap().cores.get(&core).copied()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().writes.clear();
    }
}

impl GovernorControl for RecordingGovernor {
    async fn read(&self, core: u32) -> Result<GovernorState, GovernorError> {
        self.state_of(core).ok_or(GovernorError::CoreNotFound(core))
    }

    async fn write(&self, core: u32, state: GovernorState) -> Result<(), GovernorError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.faults.get(&core) {
            Some(Fault::PermissionDenied) => return Err(GovernorError::PermissionDenied(core)),
            Some(Fault::Missing) => return Err(GovernorError::CoreNotFound(core)),
            None => {}
        }
        // Comme sysfs: pas d'entrée cpufreq pour un coeur inconnu
        if !inner.cores.contains_key(&core) {
            return Err(GovernorError::CoreNotFound(core));
        }
        inner.cores.insert(core, state);
        inner.writes.push(GovernorWrite { core, state });
        log::debug!("⚙️ [MOCK] core {} -> {}", core, state);
        Ok(())
    }
}
