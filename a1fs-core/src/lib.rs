//! a1fs's on-disk filesystem engine: the image layout, allocators, directory store, path
//! resolver, and the operations that compose them.
//!
//! This crate implements the engine only. It is deliberately host-agnostic: `mkfs-a1fs` drives
//! [`format::format`] directly, and the `a1fs` driver binary wraps a [`fs::FileSystem`] with a
//! `fuser::Filesystem` adapter. Neither CLI parsing nor FUSE plumbing lives here.

pub mod alloc;
pub mod bitmap;
pub mod dir;
pub mod error;
pub mod format;
pub mod fs;
pub mod image;
pub mod layout;
pub mod ops;
pub mod path;

pub use error::{Error, Result};
pub use fs::FileSystem;
pub use image::{Image, ImageStore, MemImage};
