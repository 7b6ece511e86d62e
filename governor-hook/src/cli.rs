//! Command line of the hookscript: `<vmid> <phase>`

use crate::lifecycle::Phase;
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const USAGE_HINT: &str =
    "Not enough arguments. The first argument must be the VM ID and the second must be the phase.";

#[derive(Debug, Parser)]
#[command(version, about = "Switch the CPU governor of a VM's pinned cores on start and stop")]
pub struct Cli {
    /// ID of the VM
    pub vm_id: u32,

    /// Hookscript phase (pre-start, post-start, pre-stop, post-stop)
    pub phase: String,

    /// Config file, defaults to /etc/proxmox-hook-<binary name>.toml
    #[arg(long, env = "GOVERNOR_HOOK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse the process arguments, exiting with status 1 on bad usage
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.exit()
            }
            Err(e) => {
                eprintln!("{}\n\n{}", USAGE_HINT, e);
                std::process::exit(1);
            }
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from(self.phase.as_str())
    }

    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => {
                let argv0 = std::env::args_os().next();
                default_config_path(argv0.as_deref())
            }
        }
    }
}

/// `/etc/proxmox-hook-<stem>.toml`, the stem being the invoked binary's name
pub fn default_config_path(argv0: Option<&OsStr>) -> PathBuf {
    let stem = argv0
        .and_then(|arg| Path::new(arg).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    PathBuf::from(format!("/etc/proxmox-hook-{}.toml", stem))
}
