//! Root-framework trace classification and removal ordering.
//!
//! A mount is a trace when it exposes module content (by its `root` or its
//! mount point), carries the synthetic source label of the active root
//! implementation, or shares the loop device KernelSU mounts its module
//! image from. Traces are returned newest first: mount ids grow with
//! creation time, so every overlay is unmounted before the mount it covers.
//!
//! Classification is fail-closed. Without a recognized implementation no
//! rule set is applied and [`ScrubError::UnknownRootImplementation`] is
//! returned instead.

use std::cmp::Reverse;

use mountscrub_common::config::ScrubConfig;
use mountscrub_common::constants::{LOOP_DEVICE_PREFIX, MODULE_ROOT_PREFIX, MODULES_DIR};
use mountscrub_common::error::{Result, ScrubError};
use mountscrub_common::types::{MountRecord, ProcessFlags, RootImplementation};

use crate::mountinfo::{self, ProcessTarget};

/// Per-call classification context resolved from the flags and the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext<'a> {
    implementation: RootImplementation,
    source_label: &'static str,
    backing_device: Option<&'a str>,
}

impl<'a> TraceContext<'a> {
    /// Resolves the context for `flags` against a mount snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::UnknownRootImplementation`] if no recognized
    /// implementation bit is set.
    pub fn resolve(mounts: &'a [MountRecord], flags: ProcessFlags) -> Result<Self> {
        let implementation = resolve_implementation(flags)?;
        Ok(Self::new(mounts, implementation))
    }

    /// Builds the context for a known implementation.
    #[must_use]
    pub fn new(mounts: &'a [MountRecord], implementation: RootImplementation) -> Self {
        let backing_device = if implementation.uses_loop_modules() {
            find_module_loop_device(mounts)
        } else {
            None
        };
        Self {
            implementation,
            source_label: implementation.source_label(),
            backing_device,
        }
    }

    /// Implementation the rules were resolved for.
    #[must_use]
    pub const fn implementation(&self) -> RootImplementation {
        self.implementation
    }

    /// Loop device backing the modules directory, if one was found.
    #[must_use]
    pub const fn backing_device(&self) -> Option<&'a str> {
        self.backing_device
    }

    /// Returns `true` if `mount` reveals the root implementation.
    #[must_use]
    pub fn is_trace(&self, mount: &MountRecord) -> bool {
        mount.root.starts_with(MODULE_ROOT_PREFIX)
            || mount.target.starts_with(MODULES_DIR)
            || mount.source == self.source_label
            || self
                .backing_device
                .is_some_and(|device| mount.source == device)
    }

    /// Copies the traces out of `mounts`, newest mount first.
    #[must_use]
    pub fn select(&self, mounts: &[MountRecord]) -> Vec<MountRecord> {
        let mut traces: Vec<MountRecord> = mounts
            .iter()
            .filter(|mount| self.is_trace(mount))
            .cloned()
            .collect();
        traces.sort_by_key(|mount| Reverse(mount.id));
        traces
    }
}

/// Resolves the root implementation, logging when none is recognized.
fn resolve_implementation(flags: ProcessFlags) -> Result<RootImplementation> {
    RootImplementation::from_flags(flags).ok_or_else(|| {
        tracing::warn!(flags = flags.bits(), "could not determine root implementation");
        ScrubError::UnknownRootImplementation {
            flags: flags.bits(),
        }
    })
}

/// First loop device mounted on the modules directory.
fn find_module_loop_device(mounts: &[MountRecord]) -> Option<&str> {
    mounts
        .iter()
        .find(|mount| mount.target == MODULES_DIR && mount.source.starts_with(LOOP_DEVICE_PREFIX))
        .map(|mount| mount.source.as_str())
}

/// Selects the mounts left by the root implementation named in `flags`,
/// sorted by descending mount id.
///
/// An empty result is a valid outcome: either nothing was found or the
/// snapshot was empty.
///
/// # Errors
///
/// Returns [`ScrubError::UnknownRootImplementation`] if no recognized
/// implementation bit is set, whatever `mounts` contains.
pub fn classify_traces(mounts: &[MountRecord], flags: ProcessFlags) -> Result<Vec<MountRecord>> {
    let context = TraceContext::resolve(mounts, flags)?;
    let traces = context.select(mounts);
    tracing::debug!(
        implementation = %context.implementation(),
        backing_device = context.backing_device().unwrap_or("-"),
        count = traces.len(),
        "found mount traces"
    );
    Ok(traces)
}

/// Reads the calling process's mount table and classifies it.
///
/// # Errors
///
/// Returns [`ScrubError::UnknownRootImplementation`] if no recognized
/// implementation bit is set.
pub fn check_traces(flags: ProcessFlags) -> Result<Vec<MountRecord>> {
    check_traces_with(&ScrubConfig::default(), ProcessTarget::SelfProcess, flags)
}

/// Reads the mount table of `target` under `config.proc_root` and
/// classifies it.
///
/// The flags are checked before the table is read. An unreadable table
/// yields `Ok` with no traces.
///
/// # Errors
///
/// Returns [`ScrubError::UnknownRootImplementation`] if no recognized
/// implementation bit is set.
pub fn check_traces_with(
    config: &ScrubConfig,
    target: ProcessTarget,
    flags: ProcessFlags,
) -> Result<Vec<MountRecord>> {
    let implementation = resolve_implementation(flags)?;
    let mounts = mountinfo::read_mountinfo_with(config, target);
    if mounts.is_empty() {
        return Ok(Vec::new());
    }

    let traces = TraceContext::new(&mounts, implementation).select(&mounts);
    for mount in &traces {
        tracing::trace!(%mount, "mount trace");
    }
    tracing::debug!(
        process = %target,
        %implementation,
        count = traces.len(),
        "found mount traces"
    );
    Ok(traces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(implementation: RootImplementation) -> ProcessFlags {
        ProcessFlags::from(implementation)
    }

    fn ids(traces: &[MountRecord]) -> Vec<i32> {
        traces.iter().map(|m| m.id).collect()
    }

    fn sample_table() -> Vec<MountRecord> {
        vec![
            MountRecord::new(1, "/", "/", "/dev/block/dm-0"),
            MountRecord::new(20, "/", "/data", "/dev/block/dm-5"),
            MountRecord::new(31, "/", "/data/adb/modules", "/dev/block/loop3"),
            MountRecord::new(33, "/adb/modules/foo/system/bin", "/system/bin/foo", "/dev/block/dm-5"),
            MountRecord::new(35, "/", "/system/etc/hosts", "/dev/block/loop3"),
            MountRecord::new(40, "/", "/debug_ramdisk", "magisk"),
            MountRecord::new(41, "/", "/apex", "tmpfs"),
            MountRecord::new(42, "/", "/system/lib", "KSU"),
            MountRecord::new(43, "/", "/system/fonts", "APatch"),
        ]
    }

    #[test]
    fn loop_backed_device_catches_every_sharing_mount() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules", "/dev/block/loop0"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/loop0"),
        ];
        let traces =
            classify_traces(&mounts, flags(RootImplementation::KernelSu)).expect("should classify");
        assert_eq!(ids(&traces), vec![15, 10]);
    }

    #[test]
    fn module_root_prefix_matches_for_every_implementation() {
        let mounts = vec![MountRecord::new(5, "/adb/modules/foo", "/system/lib", "tmpfs")];
        for implementation in RootImplementation::ALL {
            let traces = classify_traces(&mounts, flags(implementation)).expect("should classify");
            assert_eq!(ids(&traces), vec![5], "{implementation}");
        }
    }

    #[test]
    fn modules_dir_target_prefix_matches() {
        let mounts = vec![MountRecord::new(
            8,
            "/",
            "/data/adb/modules/foo/webroot",
            "/dev/block/dm-5",
        )];
        let traces =
            classify_traces(&mounts, flags(RootImplementation::APatch)).expect("should classify");
        assert_eq!(ids(&traces), vec![8]);
    }

    #[test]
    fn empty_table_is_not_an_error() {
        for implementation in RootImplementation::ALL {
            let traces = classify_traces(&[], flags(implementation)).expect("should classify");
            assert!(traces.is_empty());
        }
    }

    #[test]
    fn unknown_implementation_fails_closed() {
        let mounts = sample_table();
        for bits in [0, 0x1, 1 << 31] {
            let err = classify_traces(&mounts, ProcessFlags::from_bits(bits))
                .expect_err("should refuse to classify");
            assert!(matches!(
                err,
                ScrubError::UnknownRootImplementation { flags } if flags == bits
            ));
        }
        assert!(classify_traces(&[], ProcessFlags::default()).is_err());
    }

    #[test]
    fn other_implementation_labels_are_ignored() {
        let traces =
            classify_traces(&sample_table(), flags(RootImplementation::Magisk)).expect("classify");
        assert_eq!(ids(&traces), vec![40, 33, 31]);

        let traces =
            classify_traces(&sample_table(), flags(RootImplementation::APatch)).expect("classify");
        assert_eq!(ids(&traces), vec![43, 33, 31]);
    }

    #[test]
    fn kernelsu_selects_label_and_loop_device() {
        let traces = classify_traces(&sample_table(), flags(RootImplementation::KernelSu))
            .expect("classify");
        assert_eq!(ids(&traces), vec![42, 35, 33, 31]);
    }

    #[test]
    fn loop_rule_is_kernelsu_only() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules", "/dev/block/loop0"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/loop0"),
        ];
        let traces =
            classify_traces(&mounts, flags(RootImplementation::Magisk)).expect("should classify");
        assert_eq!(ids(&traces), vec![10]);
    }

    #[test]
    fn backing_device_requires_loop_source() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules", "/dev/block/dm-9"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/dm-9"),
        ];
        let context = TraceContext::new(&mounts, RootImplementation::KernelSu);
        assert_eq!(context.backing_device(), None);
        assert_eq!(ids(&context.select(&mounts)), vec![10]);
    }

    #[test]
    fn backing_device_requires_exact_modules_target() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules_update", "/dev/block/loop1"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/loop1"),
        ];
        let context = TraceContext::new(&mounts, RootImplementation::KernelSu);
        assert_eq!(context.backing_device(), None);
    }

    #[test]
    fn first_loop_mount_on_modules_wins() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules", "/dev/block/loop2"),
            MountRecord::new(11, "/", "/data/adb/modules", "/dev/block/loop7"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/loop7"),
        ];
        let context = TraceContext::new(&mounts, RootImplementation::KernelSu);
        assert_eq!(context.backing_device(), Some("/dev/block/loop2"));
        assert_eq!(ids(&context.select(&mounts)), vec![11, 10]);
    }

    #[test]
    fn unrelated_mounts_are_left_alone() {
        let mounts = vec![
            MountRecord::new(1, "/", "/", "/dev/block/dm-0"),
            MountRecord::new(2, "/", "/data/adb", "/dev/block/dm-5"),
            MountRecord::new(3, "/adb", "/mnt/adb", "/dev/block/dm-5"),
            MountRecord::new(4, "/", "/system", "magisk2"),
        ];
        for implementation in RootImplementation::ALL {
            let traces = classify_traces(&mounts, flags(implementation)).expect("classify");
            assert!(traces.is_empty(), "{implementation}");
        }
    }

    #[test]
    fn result_ids_are_strictly_decreasing() {
        let traces = classify_traces(&sample_table(), flags(RootImplementation::KernelSu))
            .expect("classify");
        assert!(traces.windows(2).all(|pair| pair[0].id > pair[1].id));
    }

    #[test]
    fn classification_is_idempotent() {
        let mounts = sample_table();
        let first = classify_traces(&mounts, flags(RootImplementation::KernelSu)).expect("first");
        let second = classify_traces(&mounts, flags(RootImplementation::KernelSu)).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_reports_implementation_from_flags() {
        let mounts = sample_table();
        let context = TraceContext::resolve(&mounts, ProcessFlags::from_bits(ProcessFlags::ROOT_IS_KSU))
            .expect("should resolve");
        assert_eq!(context.implementation(), RootImplementation::KernelSu);
        assert_eq!(context.backing_device(), Some("/dev/block/loop3"));
    }

    #[test]
    fn check_traces_with_unreadable_table_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ScrubConfig {
            proc_root: dir.path().to_path_buf(),
            ..ScrubConfig::default()
        };
        let traces = check_traces_with(
            &config,
            ProcessTarget::SelfProcess,
            flags(RootImplementation::Magisk),
        )
        .expect("should not fail");
        assert!(traces.is_empty());
    }

    #[test]
    fn loop_rule_follows_resolved_implementation() {
        let mounts = vec![
            MountRecord::new(10, "/", "/data/adb/modules", "/dev/block/loop0"),
            MountRecord::new(15, "/", "/system/bin", "/dev/block/loop0"),
        ];
        let both = ProcessFlags::from_bits(ProcessFlags::ROOT_IS_APATCH | ProcessFlags::ROOT_IS_KSU);
        let traces = classify_traces(&mounts, both).expect("should classify");
        assert_eq!(ids(&traces), vec![10]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn check_traces_on_own_namespace() {
        let traces = check_traces(flags(RootImplementation::Magisk)).expect("should classify");
        assert!(traces.windows(2).all(|pair| pair[0].id > pair[1].id));
    }

    #[test]
    fn check_traces_with_unknown_flags_fails_before_reading() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ScrubConfig {
            proc_root: dir.path().to_path_buf(),
            ..ScrubConfig::default()
        };
        let err = check_traces_with(&config, ProcessTarget::SelfProcess, ProcessFlags::default())
            .expect_err("should fail");
        assert!(matches!(err, ScrubError::UnknownRootImplementation { flags: 0 }));
    }
}
