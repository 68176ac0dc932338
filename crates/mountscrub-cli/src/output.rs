//! Formatted output helpers for CLI commands.

use std::fmt::Write;

use mountscrub_common::types::MountRecord;

/// Formats records as a fixed-width table with a header row.
#[must_use]
pub fn format_table(records: &[MountRecord]) -> String {
    let mut table = format!("{:<8} {:<24} {:<32} {}\n", "ID", "SOURCE", "TARGET", "ROOT");
    for record in records {
        let _ = writeln!(
            table,
            "{:<8} {:<24} {:<32} {}",
            record.id, record.source, record.target, record.root
        );
    }
    table
}
