//! # mscrub — mountscrub CLI
//!
//! Inspects a process's mount table and lists the mounts a root-management
//! framework left behind, in the order they would have to be unmounted.
//! Read-only: nothing is ever unmounted.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
