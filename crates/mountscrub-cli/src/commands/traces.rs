//! `mscrub traces` — List root-framework mount traces in unmount order.

use clap::Args;
use mountscrub_common::config::ScrubConfig;
use mountscrub_common::types::{MountRecord, ProcessFlags, RootImplementation};
use mountscrub_core::trace;
use serde::Serialize;

use crate::output;

/// Arguments for the `traces` command.
#[derive(Args, Debug)]
pub struct TracesArgs {
    /// Process to inspect (defaults to mscrub itself).
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Active root implementation: apatch, ksu or magisk.
    #[arg(long, conflicts_with = "flags", required_unless_present = "flags")]
    pub root: Option<RootImplementation>,

    /// Raw process flag bits, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_flag_bits)]
    pub flags: Option<u32>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl TracesArgs {
    fn process_flags(&self) -> ProcessFlags {
        self.root.map_or_else(
            || ProcessFlags::from_bits(self.flags.unwrap_or_default()),
            ProcessFlags::from,
        )
    }
}

/// JSON document printed with `--json`.
#[derive(Debug, Serialize)]
struct TraceReport<'a> {
    process: String,
    implementation: Option<RootImplementation>,
    traces: &'a [MountRecord],
}

fn parse_flag_bits(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid flag bits '{value}': {e}"))
}

/// Executes the `traces` command.
///
/// # Errors
///
/// Returns an error if the root implementation cannot be determined or
/// JSON serialization fails.
pub fn execute(config: &ScrubConfig, args: TracesArgs) -> anyhow::Result<()> {
    let target = super::process_target(args.pid);
    let flags = args.process_flags();
    let traces = trace::check_traces_with(config, target, flags)?;

    if args.json {
        let report = TraceReport {
            process: target.to_string(),
            implementation: RootImplementation::from_flags(flags),
            traces: &traces,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if traces.is_empty() {
        println!("No mount traces found for {target}.");
    } else {
        print!("{}", output::format_table(&traces));
    }
    Ok(())
}
