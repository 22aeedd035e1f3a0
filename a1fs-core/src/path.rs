//! Path resolution: walks `/`-separated components from the root inode using the directory
//! store and inode table.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::image::ImageStore;
use crate::layout::Inode;

/// Inode number of the root directory. Always allocated, its own parent.
pub const ROOT_INO: u32 = 0;

impl<I: ImageStore> FileSystem<I> {
	/// Resolves an absolute path to its inode. An empty path or `/` resolves to the root.
	pub fn resolve(&self, path: &str) -> Result<Inode> {
		let mut current = self.inode(ROOT_INO);
		for component in path.split('/').filter(|c| !c.is_empty()) {
			if !current.is_dir() {
				return Err(Error::NotDirectory);
			}
			let ent = self.lookup_entry(&current, component)?;
			current = self.inode(ent.ino);
		}
		Ok(current)
	}

	/// Splits `path` into its parent directory inode and final component name. Fails with
	/// [`Error::NotFound`] if `path` has no final component (i.e. is the root).
	pub fn resolve_parent<'p>(&self, path: &'p str) -> Result<(Inode, &'p str)> {
		let path = path.trim_end_matches('/');
		let (parent_path, name) = match path.rfind('/') {
			Some(idx) => (&path[..idx], &path[idx + 1..]),
			None => ("", path),
		};
		if name.is_empty() {
			return Err(Error::NotFound);
		}
		let parent = self.resolve(parent_path)?;
		Ok((parent, name))
	}
}
