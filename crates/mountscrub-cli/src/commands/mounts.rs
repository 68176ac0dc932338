//! `mscrub mounts` — Print the parsed mount table of a process.

use clap::Args;
use mountscrub_common::config::ScrubConfig;
use mountscrub_core::mountinfo;

use crate::output;

/// Arguments for the `mounts` command.
#[derive(Args, Debug)]
pub struct MountsArgs {
    /// Process to inspect (defaults to mscrub itself).
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `mounts` command.
///
/// An unreadable table prints as empty, matching the reader's contract.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(config: &ScrubConfig, args: MountsArgs) -> anyhow::Result<()> {
    let target = super::process_target(args.pid);
    let mounts = mountinfo::read_mountinfo_with(config, target);
    tracing::info!(process = %target, count = mounts.len(), "mount table parsed");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mounts)?);
    } else if mounts.is_empty() {
        println!("No mounts found for {target}.");
    } else {
        print!("{}", output::format_table(&mounts));
    }
    Ok(())
}
