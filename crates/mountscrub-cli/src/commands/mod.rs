//! CLI command definitions and dispatch.

pub mod mounts;
pub mod traces;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mountscrub_common::config::ScrubConfig;
use mountscrub_core::mountinfo::ProcessTarget;
use nix::unistd::Pid;

/// mscrub — find and order root-framework mount traces.
#[derive(Parser, Debug)]
#[command(name = "mscrub", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true, env = "MSCRUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mount point of the proc filesystem (overrides the configuration).
    #[arg(long, global = true)]
    pub proc_root: Option<PathBuf>,

    /// Keep `\ooo` escapes in path fields instead of decoding them.
    #[arg(long, global = true)]
    pub raw_escapes: bool,
}

impl Cli {
    /// Builds the effective configuration: file first, then flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn scrub_config(&self) -> anyhow::Result<ScrubConfig> {
        let mut config = match &self.config {
            Some(path) => ScrubConfig::load(path)?,
            None => ScrubConfig::default(),
        };
        if let Some(proc_root) = &self.proc_root {
            config.proc_root.clone_from(proc_root);
        }
        if self.raw_escapes {
            config.decode_escapes = false;
        }
        tracing::debug!(config = ?config, "effective configuration");
        Ok(config)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the parsed mount table of a process.
    Mounts(mounts::MountsArgs),
    /// List root-framework mount traces in unmount order.
    Traces(traces::TracesArgs),
}

/// Maps an optional `--pid` value to the process to inspect.
pub fn process_target(pid: Option<i32>) -> ProcessTarget {
    pid.map_or(ProcessTarget::SelfProcess, |pid| {
        ProcessTarget::Pid(Pid::from_raw(pid))
    })
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.scrub_config()?;
    match cli.command {
        Command::Mounts(args) => mounts::execute(&config, args),
        Command::Traces(args) => traces::execute(&config, args),
    }
}
