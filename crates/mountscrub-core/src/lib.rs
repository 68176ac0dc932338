//! # mountscrub-core
//!
//! Finds the mounts a root-management framework left in a mount namespace
//! and orders them for removal.
//!
//! - **Mount table reader** ([`mountinfo`]): parses `/proc/<pid>/mountinfo`
//!   into [`MountRecord`](mountscrub_common::types::MountRecord)s. Read
//!   failures yield an empty table.
//! - **Trace classifier** ([`trace`]): selects the records attributable to
//!   the active root implementation and sorts them newest first, so that
//!   overlays are unmounted before the mounts they cover.
//!
//! Nothing here unmounts anything; the caller owns the unmount loop.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod mountinfo;
pub mod trace;
