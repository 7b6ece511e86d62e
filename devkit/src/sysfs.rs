/*!
Arborescence sysfs temporaire

Reproduit `cpuN/cpufreq/scaling_governor` (et optionnellement
`scaling_available_governors`) dans un répertoire temporaire pour tester
`SysfsGovernor` sans toucher au vrai noyau.
*/

use anyhow::Result;
use governor_hook::governor::{GovernorState, SysfsGovernor};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct FakeSysfs {
    dir: TempDir,
}

impl FakeSysfs {
    pub fn new() -> Result<Self> {
        Ok(Self { dir: TempDir::new()? })
    }

    /// Crée `count` coeurs (0..count) avec le governor donné
    pub fn with_cores(count: u32, state: GovernorState) -> Result<Self> {
        let sysfs = Self::new()?;
        for core in 0..count {
            sysfs.add_core(core, state)?;
        }
        Ok(sysfs)
    }

    pub fn add_core(&self, core: u32, state: GovernorState) -> Result<()> {
        let cpufreq = self.cpufreq_dir(core);
        fs::create_dir_all(&cpufreq)?;
        // Le noyau termine la valeur par un saut de ligne
        fs::write(cpufreq.join("scaling_governor"), format!("{}\n", state))?;
        Ok(())
    }

    /// Restreint les governors acceptés par un coeur
    pub fn set_available(&self, core: u32, states: &[GovernorState]) -> Result<()> {
        let names: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
        fs::write(
            self.cpufreq_dir(core).join("scaling_available_governors"),
            format!("{}\n", names.join(" ")),
        )?;
        Ok(())
    }

    /// Contenu brut de `scaling_governor`
    pub fn raw_governor(&self, core: u32) -> Result<String> {
        Ok(fs::read_to_string(self.cpufreq_dir(core).join("scaling_governor"))?)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `SysfsGovernor` pointant sur cette arborescence
    pub fn governor(&self) -> SysfsGovernor {
        SysfsGovernor::new(self.root())
    }

    fn cpufreq_dir(&self, core: u32) -> PathBuf {
        self.root().join(format!("cpu{}", core)).join("cpufreq")
    }
}
