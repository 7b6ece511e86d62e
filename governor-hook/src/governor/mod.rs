//! CPU frequency governor control for the hook
//!
//! Handles per-core access to the kernel cpufreq interface:
//! - Reading the active governor (`scaling_governor`)
//! - Writing a new governor for one core
//! - Listing the governors a core accepts (`scaling_available_governors`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default sysfs location of the per-core cpufreq directories
pub const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Linux CPU governor policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernorState {
    Performance,
    Powersave,
    Userspace,
    Ondemand,
    Conservative,
    Schedutil,
}

impl GovernorState {
    pub const ALL: [GovernorState; 6] = [
        GovernorState::Performance,
        GovernorState::Powersave,
        GovernorState::Userspace,
        GovernorState::Ondemand,
        GovernorState::Conservative,
        GovernorState::Schedutil,
    ];

    /// Canonical name as used by the kernel
    pub fn as_str(&self) -> &'static str {
        match self {
            GovernorState::Performance => "performance",
            GovernorState::Powersave => "powersave",
            GovernorState::Userspace => "userspace",
            GovernorState::Ondemand => "ondemand",
            GovernorState::Conservative => "conservative",
            GovernorState::Schedutil => "schedutil",
        }
    }
}

impl fmt::Display for GovernorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the six governor names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized governor: {0:?}")]
pub struct UnknownGovernor(pub String);

impl FromStr for GovernorState {
    type Err = UnknownGovernor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // sysfs reads end with a newline
        let name = s.trim();
        GovernorState::ALL
            .into_iter()
            .find(|state| state.as_str() == name)
            .ok_or_else(|| UnknownGovernor(name.to_string()))
    }
}

/// Errors raised while touching the cpufreq interface
#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    #[error("CPU core {0} not found (no cpufreq entry)")]
    CoreNotFound(u32),
    #[error("Governor {state:?} not supported by CPU core {core}")]
    UnsupportedGovernor { core: u32, state: String },
    #[error("Permission denied writing governor for CPU core {0}")]
    PermissionDenied(u32),
    #[error("IO error on CPU core {core}: {source}")]
    Io {
        core: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Seam between the lifecycle dispatcher and the kernel interface
#[allow(async_fn_in_trait)]
pub trait GovernorControl {
    /// Current governor of a core
    async fn read(&self, core: u32) -> Result<GovernorState, GovernorError>;

    /// Switch a core to the given governor
    async fn write(&self, core: u32, state: GovernorState) -> Result<(), GovernorError>;
}

/// Governor control through sysfs pseudo-files
#[derive(Debug, Clone)]
pub struct SysfsGovernor {
    root: PathBuf,
}

impl Default for SysfsGovernor {
    fn default() -> Self {
        Self::new(SYSFS_CPU_ROOT)
    }
}

impl SysfsGovernor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cpufreq_file(&self, core: u32, name: &str) -> PathBuf {
        self.root
            .join(format!("cpu{}", core))
            .join("cpufreq")
            .join(name)
    }

    /// Governors the core accepts, `None` when the kernel does not say
    pub async fn available(&self, core: u32) -> Result<Option<Vec<GovernorState>>, GovernorError> {
        let path = self.cpufreq_file(core, "scaling_available_governors");
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::map_io(core, e)),
        };

        // Out-of-tree governors are listed too, only the known ones matter here
        let states: Vec<GovernorState> = content
            .split_whitespace()
            .filter_map(|name| name.parse().ok())
            .collect();
        Ok(Some(states))
    }

    fn map_io(core: u32, e: std::io::Error) -> GovernorError {
        match e.kind() {
            ErrorKind::NotFound => GovernorError::CoreNotFound(core),
            ErrorKind::PermissionDenied => GovernorError::PermissionDenied(core),
            _ => GovernorError::Io { core, source: e },
        }
    }
}

impl GovernorControl for SysfsGovernor {
    async fn read(&self, core: u32) -> Result<GovernorState, GovernorError> {
        let path = self.cpufreq_file(core, "scaling_governor");
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::map_io(core, e))?;

        content
            .parse::<GovernorState>()
            .map_err(|UnknownGovernor(state)| GovernorError::UnsupportedGovernor { core, state })
    }

    async fn write(&self, core: u32, state: GovernorState) -> Result<(), GovernorError> {
        let path = self.cpufreq_file(core, "scaling_governor");
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Err(GovernorError::CoreNotFound(core)),
            Err(e) => return Err(Self::map_io(core, e)),
        }

        if let Some(available) = self.available(core).await? {
            if !available.contains(&state) {
                return Err(GovernorError::UnsupportedGovernor {
                    core,
                    state: state.to_string(),
                });
            }
        }

        debug!("Writing governor {} to {}", state, path.display());
        match tokio::fs::write(&path, state.as_str()).await {
            Ok(()) => {}
            // The kernel answers EINVAL for governors it does not know
            Err(e) if e.kind() == ErrorKind::InvalidInput => {
                return Err(GovernorError::UnsupportedGovernor {
                    core,
                    state: state.to_string(),
                });
            }
            Err(e) => return Err(Self::map_io(core, e)),
        }

        info!("CPU core {} governor set to {}", core, state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sysfs_with_core(core: u32, current: &str, available: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        let cpufreq = dir.path().join(format!("cpu{}", core)).join("cpufreq");
        fs::create_dir_all(&cpufreq).unwrap();
        fs::write(cpufreq.join("scaling_governor"), current).unwrap();
        if let Some(available) = available {
            fs::write(cpufreq.join("scaling_available_governors"), available).unwrap();
        }
        dir
    }

    #[test]
    fn test_state_names() {
        assert_eq!(GovernorState::Performance.to_string(), "performance");
        assert_eq!("schedutil\n".parse::<GovernorState>().unwrap(), GovernorState::Schedutil);
        assert_eq!(
            "turbo".parse::<GovernorState>(),
            Err(UnknownGovernor("turbo".to_string()))
        );
        // Names are lowercase only
        assert!("Performance".parse::<GovernorState>().is_err());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = sysfs_with_core(2, "schedutil\n", None);
        let governor = SysfsGovernor::new(dir.path());

        governor.write(2, GovernorState::Performance).await.unwrap();
        assert_eq!(governor.read(2).await.unwrap(), GovernorState::Performance);

        governor.write(2, GovernorState::Powersave).await.unwrap();
        assert_eq!(governor.read(2).await.unwrap(), GovernorState::Powersave);
    }

    #[tokio::test]
    async fn test_missing_core() {
        let dir = sysfs_with_core(0, "performance\n", None);
        let governor = SysfsGovernor::new(dir.path());

        assert!(matches!(governor.read(7).await, Err(GovernorError::CoreNotFound(7))));
        assert!(matches!(
            governor.write(7, GovernorState::Performance).await,
            Err(GovernorError::CoreNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_stat_failure_is_not_a_missing_core() {
        let dir = sysfs_with_core(0, "performance\n", None);
        // cpu5 is a plain file, so the cpufreq path cannot be resolved
        fs::write(dir.path().join("cpu5"), "").unwrap();
        let governor = SysfsGovernor::new(dir.path());

        assert!(matches!(
            governor.write(5, GovernorState::Performance).await,
            Err(GovernorError::Io { core: 5, .. })
        ));
        assert!(matches!(governor.read(5).await, Err(GovernorError::Io { core: 5, .. })));
    }

    #[tokio::test]
    async fn test_unknown_value_in_sysfs() {
        let dir = sysfs_with_core(1, "interactive\n", None);
        let governor = SysfsGovernor::new(dir.path());

        match governor.read(1).await {
            Err(GovernorError::UnsupportedGovernor { core, state }) => {
                assert_eq!(core, 1);
                assert_eq!(state, "interactive");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_checks_available_governors() {
        let dir = sysfs_with_core(3, "powersave\n", Some("performance powersave\n"));
        let governor = SysfsGovernor::new(dir.path());

        assert!(matches!(
            governor.write(3, GovernorState::Schedutil).await,
            Err(GovernorError::UnsupportedGovernor { core: 3, .. })
        ));
        // Rejected write leaves the previous value untouched
        assert_eq!(governor.read(3).await.unwrap(), GovernorState::Powersave);

        governor.write(3, GovernorState::Performance).await.unwrap();
        assert_eq!(governor.read(3).await.unwrap(), GovernorState::Performance);
    }

    #[tokio::test]
    async fn test_available_skips_unknown_names() {
        let listed = "conservative ondemand userspace interactive\n";
        let dir = sysfs_with_core(0, "performance\n", Some(listed));
        let governor = SysfsGovernor::new(dir.path());

        let available = governor.available(0).await.unwrap().unwrap();
        assert_eq!(
            available,
            vec![
                GovernorState::Conservative,
                GovernorState::Ondemand,
                GovernorState::Userspace,
            ]
        );

        let bare = sysfs_with_core(0, "performance\n", None);
        assert_eq!(SysfsGovernor::new(bare.path()).available(0).await.unwrap(), None);
    }
}
