//! The directory store: a directory's content is a dense, append-at-end array of 256-byte
//! entries scattered across its extents, addressed the same way any other file content is
//! (see [`crate::fs::FileSystem::map_offset`]).

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::image::ImageStore;
use crate::layout::{DirEntry, Inode, DIRENTRY_SIZE, NAME_MAX};

impl<I: ImageStore> FileSystem<I> {
	/// Appends a `(name, ino)` entry to `dir`'s content, growing it by one block first if the
	/// current size is block-aligned. Bumps `dir.links` if `ino` names a directory. Persists
	/// `dir` before returning.
	pub fn add_entry(&mut self, dir: &mut Inode, name: &str, ino: u32) -> Result<()> {
		if name.len() >= NAME_MAX {
			return Err(Error::NameTooLong);
		}
		if dir.size % crate::layout::BLOCK_SIZE == 0 {
			self.allocate_blocks(dir, 1)?;
		}
		let (blk, off) = self.map_offset(dir, dir.size);
		DirEntry::new(ino, name).write(self.block_mut(blk), off);
		dir.size += DIRENTRY_SIZE;
		if self.inode(ino).is_dir() {
			dir.links += 1;
		}
		self.write_inode(dir);
		Ok(())
	}

	/// Scans `dir`'s entries in stored order for `name`.
	pub fn lookup_entry(&self, dir: &Inode, name: &str) -> Result<DirEntry> {
		self.entry_index(dir, name).map(|(ent, _)| ent)
	}

	fn entry_index(&self, dir: &Inode, name: &str) -> Result<(DirEntry, u64)> {
		let n = dir.size / DIRENTRY_SIZE;
		for i in 0..n {
			let (blk, off) = self.map_offset(dir, i * DIRENTRY_SIZE);
			let ent = DirEntry::read(self.block(blk), off);
			if ent.name() == name {
				return Ok((ent, i));
			}
		}
		Err(Error::NotFound)
	}

	/// Every entry currently stored in `dir`, in stored order.
	pub fn read_entries(&self, dir: &Inode) -> Vec<DirEntry> {
		let n = dir.size / DIRENTRY_SIZE;
		(0..n)
			.map(|i| {
				let (blk, off) = self.map_offset(dir, i * DIRENTRY_SIZE);
				DirEntry::read(self.block(blk), off)
			})
			.collect()
	}

	/// Removes the entry named `name` from `dir` by swapping the last entry into its slot and
	/// shrinking by one, releasing a trailing block when the new size becomes block-aligned.
	/// Drops one from `dir.links` if the removed entry named a directory. Persists `dir` before
	/// returning.
	pub fn remove_entry(&mut self, dir: &mut Inode, name: &str) -> Result<DirEntry> {
		let (removed, index) = self.entry_index(dir, name)?;
		let was_dir = self.inode(removed.ino).is_dir();

		let last_index = dir.size / DIRENTRY_SIZE - 1;
		if index != last_index {
			let (last_blk, last_off) = self.map_offset(dir, last_index * DIRENTRY_SIZE);
			let last = DirEntry::read(self.block(last_blk), last_off);
			let (blk, off) = self.map_offset(dir, index * DIRENTRY_SIZE);
			last.write(self.block_mut(blk), off);
		}

		dir.size -= DIRENTRY_SIZE;
		if dir.size % crate::layout::BLOCK_SIZE == 0 {
			self.deallocate_blocks(dir, 1);
		}
		if was_dir {
			dir.links -= 1;
		}
		self.write_inode(dir);
		Ok(removed)
	}
}
