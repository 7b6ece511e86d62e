//! cpu-affinity-hook - Proxmox VE hookscript entry point
//!
//! Called by `qm` as `<hook> <vmid> <phase>`. Only `pre-start` and
//! `post-stop` do anything; a failure exits non-zero so the task log shows it.

use anyhow::{Context, Result};
use governor_hook::cli::Cli;
use governor_hook::{lifecycle, HookConfig, Phase, ProxmoxClient, SysfsGovernor, VmLocator};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_or_exit();

    // stderr ends up in the PVE task log
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("governor_hook=info,cpu_affinity_hook=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let phase = cli.phase();
    if let Phase::Other(name) = &phase {
        debug!("Phase {} ignored for VM {}", name, cli.vm_id);
        return Ok(());
    }

    let config_path = cli.config_path();
    let config = HookConfig::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    debug!("Loaded {:?}", config);

    let client = ProxmoxClient::from_config(&config)
        .await
        .with_context(|| format!("Failed to connect to Proxmox API on {}", config.hostname))?;
    let locator = VmLocator::new(client);
    let governor = SysfsGovernor::default();

    info!("VM {} {}: applying CPU governors", cli.vm_id, phase);
    let report = lifecycle::dispatch(&phase, &config, &locator, &governor, cli.vm_id)
        .await
        .with_context(|| format!("Governor transition failed for VM {} ({})", cli.vm_id, phase))?;

    if let Some(report) = report {
        info!(
            "VM {}: {} core(s) set to {} {:?}",
            report.vm_id,
            report.cores.len(),
            report.state,
            report.cores
        );
    }

    Ok(())
}
