//! This module implements features common to the `mkfs-a1fs` and `a1fs` binaries.

pub mod disk;
pub mod util;
