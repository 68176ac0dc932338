//! Domain primitive types used across the mountscrub workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScrubError;

/// One row of a mount table at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountRecord {
    /// Kernel-assigned mount identifier, increasing with creation order.
    pub id: i32,
    /// Path inside the mounted filesystem that is visible at `target`.
    pub root: String,
    /// Mount point in the current namespace.
    pub target: String,
    /// Backing device, special file, or synthetic label.
    pub source: String,
}

impl MountRecord {
    /// Creates a record from its four fields.
    #[must_use]
    pub fn new(
        id: i32,
        root: impl Into<String>,
        target: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id,
            root: root.into(),
            target: target.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for MountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} (root {})",
            self.id, self.source, self.target, self.root
        )
    }
}

/// Process flag bits handed over by the injector.
///
/// Only the root implementation bits are interpreted here; every other bit
/// is carried through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessFlags(u32);

impl ProcessFlags {
    /// The active root implementation is APatch.
    pub const ROOT_IS_APATCH: u32 = 1 << 28;
    /// The active root implementation is KernelSU.
    pub const ROOT_IS_KSU: u32 = 1 << 29;
    /// The active root implementation is Magisk.
    pub const ROOT_IS_MAGISK: u32 = 1 << 30;

    /// Wraps raw flag bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if any bit of `mask` is set.
    #[must_use]
    pub const fn intersects(self, mask: u32) -> bool {
        self.0 & mask != 0
    }
}

impl From<RootImplementation> for ProcessFlags {
    fn from(implementation: RootImplementation) -> Self {
        Self(implementation.flag())
    }
}

/// Root-management framework active on the device.
///
/// "Unknown" is expressed as `None` from [`RootImplementation::from_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootImplementation {
    /// APatch.
    APatch,
    /// KernelSU, which mounts its module image from a loop device.
    KernelSu,
    /// Magisk.
    Magisk,
}

struct ImplementationEntry {
    implementation: RootImplementation,
    flag: u32,
    source_label: &'static str,
    name: &'static str,
}

/// Lookup table in resolution priority order.
///
/// Entries are indexed by the enum discriminant.
static IMPLEMENTATIONS: [ImplementationEntry; 3] = [
    ImplementationEntry {
        implementation: RootImplementation::APatch,
        flag: ProcessFlags::ROOT_IS_APATCH,
        source_label: "APatch",
        name: "apatch",
    },
    ImplementationEntry {
        implementation: RootImplementation::KernelSu,
        flag: ProcessFlags::ROOT_IS_KSU,
        source_label: "KSU",
        name: "ksu",
    },
    ImplementationEntry {
        implementation: RootImplementation::Magisk,
        flag: ProcessFlags::ROOT_IS_MAGISK,
        source_label: "magisk",
        name: "magisk",
    },
];

impl RootImplementation {
    /// All recognized implementations in resolution priority order.
    pub const ALL: [Self; 3] = [Self::APatch, Self::KernelSu, Self::Magisk];

    /// Resolves the active implementation from process flags.
    ///
    /// When several implementation bits are set, the first one in
    /// [`Self::ALL`] order wins.
    #[must_use]
    pub fn from_flags(flags: ProcessFlags) -> Option<Self> {
        IMPLEMENTATIONS
            .iter()
            .find(|entry| flags.intersects(entry.flag))
            .map(|entry| entry.implementation)
    }

    fn entry(self) -> &'static ImplementationEntry {
        &IMPLEMENTATIONS[self as usize]
    }

    /// Flag bit announcing this implementation.
    #[must_use]
    pub fn flag(self) -> u32 {
        self.entry().flag
    }

    /// Label the implementation uses as `source` of its synthetic mounts.
    #[must_use]
    pub fn source_label(self) -> &'static str {
        self.entry().source_label
    }

    /// Whether module files are served from a loop-mounted image.
    #[must_use]
    pub const fn uses_loop_modules(self) -> bool {
        matches!(self, Self::KernelSu)
    }
}

impl fmt::Display for RootImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry().name)
    }
}

impl FromStr for RootImplementation {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        IMPLEMENTATIONS
            .iter()
            .find(|entry| entry.name == wanted || entry.source_label.eq_ignore_ascii_case(s))
            .map(|entry| entry.implementation)
            .ok_or_else(|| ScrubError::Config {
                message: format!("unknown root implementation: {s}"),
            })
    }
}
