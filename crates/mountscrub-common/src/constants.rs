//! System-wide constants and well-known paths.

/// Default mount point of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Name of the per-process mount table file under `/proc/<pid>/`.
pub const MOUNTINFO_FILE: &str = "mountinfo";

/// Directory component used to address the calling process under `/proc`.
pub const SELF_DIR: &str = "self";

/// Directory where root frameworks install their modules.
pub const MODULES_DIR: &str = "/data/adb/modules";

/// Filesystem-relative root shared by per-module bind mounts.
///
/// Modules live on the `/data` filesystem, so the `root` field of their
/// bind mounts starts with `/adb/modules` rather than `/data/adb/modules`.
pub const MODULE_ROOT_PREFIX: &str = "/adb/modules";

/// Source prefix of loop block devices.
pub const LOOP_DEVICE_PREFIX: &str = "/dev/block/loop";

/// Upper bound, in bytes, for a single path field of a mount record.
///
/// Longer fields are truncated, never rejected.
pub const MAX_FIELD_LEN: usize = 4095;

/// Token separating the optional fields from the filesystem-specific suffix
/// of a mountinfo line.
pub const OPTIONAL_FIELDS_TERMINATOR: &str = "-";

