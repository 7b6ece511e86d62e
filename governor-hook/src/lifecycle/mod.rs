//! VM lifecycle handling
//!
//! Maps hookscript phases to governor transitions on the VM's pinned cores:
//! - `pre-start`: every pinned core gets `started_state`
//! - `post-stop`: every pinned core gets `stopped_state`
//! - any other phase: nothing
//!
//! Writes are applied core by core. A failure stops the run and the cores
//! already switched keep their new governor.

use crate::cluster::{ClusterApi, ClusterError, VmLocator};
use crate::config::HookConfig;
use crate::governor::{GovernorControl, GovernorError, GovernorState};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Governor(#[from] GovernorError),
}

/// Hookscript phase as passed by `qm`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    PreStart,
    PostStop,
    /// post-start, pre-stop and anything else
    Other(String),
}

impl From<&str> for Phase {
    fn from(value: &str) -> Self {
        match value {
            "pre-start" => Phase::PreStart,
            "post-stop" => Phase::PostStop,
            other => Phase::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreStart => f.write_str("pre-start"),
            Phase::PostStop => f.write_str("post-stop"),
            Phase::Other(phase) => f.write_str(phase),
        }
    }
}

/// Cores switched by one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub vm_id: u32,
    pub state: GovernorState,
    pub cores: Vec<u32>,
}

/// Switch the VM's cores to `config.started_state`
pub async fn on_start<C, G>(
    config: &HookConfig,
    locator: &VmLocator<C>,
    governor: &G,
    vm_id: u32,
) -> Result<TransitionReport, LifecycleError>
where
    C: ClusterApi,
    G: GovernorControl,
{
    apply(locator, governor, vm_id, config.started_state).await
}

/// Switch the VM's cores back to `config.stopped_state`
pub async fn on_stop<C, G>(
    config: &HookConfig,
    locator: &VmLocator<C>,
    governor: &G,
    vm_id: u32,
) -> Result<TransitionReport, LifecycleError>
where
    C: ClusterApi,
    G: GovernorControl,
{
    apply(locator, governor, vm_id, config.stopped_state).await
}

/// Run the transition for a phase, `None` when the phase needs no action
pub async fn dispatch<C, G>(
    phase: &Phase,
    config: &HookConfig,
    locator: &VmLocator<C>,
    governor: &G,
    vm_id: u32,
) -> Result<Option<TransitionReport>, LifecycleError>
where
    C: ClusterApi,
    G: GovernorControl,
{
    match phase {
        Phase::PreStart => on_start(config, locator, governor, vm_id).await.map(Some),
        Phase::PostStop => on_stop(config, locator, governor, vm_id).await.map(Some),
        Phase::Other(name) => {
            debug!("Nothing to do for VM {} in phase {}", vm_id, name);
            Ok(None)
        }
    }
}

async fn apply<C, G>(
    locator: &VmLocator<C>,
    governor: &G,
    vm_id: u32,
    state: GovernorState,
) -> Result<TransitionReport, LifecycleError>
where
    C: ClusterApi,
    G: GovernorControl,
{
    let affinity = locator.affinities(vm_id).await?;
    if affinity.is_empty() {
        info!("VM {} has no CPU affinity, governors left untouched", vm_id);
    }

    let mut cores = Vec::new();
    for core in affinity.cores() {
        governor.write(core, state).await?;
        cores.push(core);
    }

    Ok(TransitionReport { vm_id, state, cores })
}
