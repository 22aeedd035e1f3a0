//! The operations layer: the user-visible filesystem calls, each implemented by composing the
//! allocator, directory store and path resolver.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::image::ImageStore;
use crate::layout::{Inode, BLOCK_SIZE, S_IFDIR, S_IFREG};
use crate::path::ROOT_INO;

/// Longest path this engine will resolve. Anything at or beyond this is rejected up front, the
/// same way a real VFS bounds `PATH_MAX` before ever touching a filesystem driver.
pub const PATH_MAX: usize = 4096;

/// A `statfs`-style summary of the whole filesystem.
#[derive(Debug, Clone, Copy)]
pub struct StatFs {
	pub block_size: u64,
	pub total_blocks: u64,
	pub free_blocks: u64,
	pub total_inodes: u64,
	pub free_inodes: u64,
	pub name_max: u32,
}

/// The subset of an inode's metadata a `getattr`-style call reports.
#[derive(Debug, Clone, Copy)]
pub struct Attr {
	pub ino: u32,
	pub mode: u32,
	pub links: u32,
	pub size: u64,
	/// Allocation footprint in 512-byte sectors: the size rounded up to whole blocks, then
	/// converted to sectors, not the logical byte size rounded to sectors directly.
	pub blocks_512: u64,
	pub mtime_sec: i64,
	pub mtime_nsec: i64,
}

/// What to do with an inode's modification time in [`FileSystem::utimens`]. There is no atime
/// field in this on-disk format, so only mtime is settable.
#[derive(Debug, Clone, Copy)]
pub enum MTime {
	/// Leave the timestamp unchanged (`UTIME_OMIT`).
	Omit,
	/// Stamp with the current real time (`UTIME_NOW`).
	Now,
	/// Stamp with this exact `(seconds, nanoseconds)` pair.
	Set(i64, i64),
}

fn now() -> (i64, i64) {
	let d = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default();
	(d.as_secs() as i64, d.subsec_nanos() as i64)
}

impl Attr {
	fn from_inode(inode: &Inode) -> Self {
		Self {
			ino: inode.ino,
			mode: inode.mode,
			links: inode.links,
			size: inode.size,
			blocks_512: inode.size.div_ceil(BLOCK_SIZE) * (BLOCK_SIZE / 512),
			mtime_sec: inode.mtime_sec,
			mtime_nsec: inode.mtime_nsec,
		}
	}
}

impl<I: ImageStore> FileSystem<I> {
	fn touch(&mut self, inode: &mut Inode) {
		let (sec, nsec) = now();
		inode.mtime_sec = sec;
		inode.mtime_nsec = nsec;
	}

	fn check_path_len(path: &str) -> Result<()> {
		if path.len() >= PATH_MAX {
			return Err(Error::NameTooLong);
		}
		Ok(())
	}

	/// Reports aggregate filesystem statistics. Infallible.
	pub fn stat_fs(&self) -> StatFs {
		let sb = self.superblock();
		StatFs {
			block_size: BLOCK_SIZE,
			total_blocks: sb.total_blocks(),
			free_blocks: sb.free_blocks as u64,
			total_inodes: sb.inodes_count as u64,
			free_inodes: sb.free_inodes as u64,
			name_max: crate::layout::NAME_MAX as u32,
		}
	}

	/// Resolves `path` and reports its metadata.
	pub fn get_attr(&self, path: &str) -> Result<Attr> {
		Self::check_path_len(path)?;
		let inode = self.resolve(path)?;
		Ok(Attr::from_inode(&inode))
	}

	/// Resolves `path` (assumed a directory) and lists its entries, `.` and `..` first.
	pub fn read_dir(&self, path: &str) -> Result<Vec<String>> {
		let dir = self.resolve(path)?;
		if !dir.is_dir() {
			return Err(Error::NotDirectory);
		}
		let mut names = vec![".".to_string(), "..".to_string()];
		names.extend(self.read_entries(&dir).iter().map(|e| e.name().to_string()));
		Ok(names)
	}

	fn create_node(&mut self, path: &str, mode: u32, file_type: u32, links: u32) -> Result<u32> {
		let (mut parent, name) = self.resolve_parent(path)?;
		if !parent.is_dir() {
			return Err(Error::NotDirectory);
		}
		let ino = self.alloc_inode()?;
		let mut node = Inode::empty(ino);
		node.mode = (mode & !crate::layout::S_IFMT) | file_type;
		node.links = links;
		let (sec, nsec) = now();
		node.mtime_sec = sec;
		node.mtime_nsec = nsec;
		self.write_inode(&node);

		if let Err(e) = self.add_entry(&mut parent, name, ino) {
			// Roll back the otherwise-leaked inode: nothing references it yet.
			self.free_inode(ino);
			return Err(e);
		}
		Ok(ino)
	}

	/// Creates a new, empty directory at `path`.
	pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<()> {
		self.create_node(path, mode, S_IFDIR, 2)?;
		Ok(())
	}

	/// Creates a new, empty regular file at `path`.
	pub fn create(&mut self, path: &str, mode: u32) -> Result<()> {
		self.create_node(path, mode, S_IFREG, 1)?;
		Ok(())
	}

	/// Removes the empty directory at `path`.
	pub fn rmdir(&mut self, path: &str) -> Result<()> {
		let (mut parent, name) = self.resolve_parent(path)?;
		if !parent.is_dir() {
			return Err(Error::NotDirectory);
		}
		let entry = self.lookup_entry(&parent, name)?;
		let mut target = self.inode(entry.ino);
		if !target.is_dir() {
			return Err(Error::NotDirectory);
		}
		if target.size > 0 {
			return Err(Error::NotEmpty);
		}
		self.release_all_blocks(&mut target);
		self.free_inode(target.ino);
		self.remove_entry(&mut parent, name)?;
		Ok(())
	}

	/// Removes the regular file at `path`.
	pub fn unlink(&mut self, path: &str) -> Result<()> {
		let (mut parent, name) = self.resolve_parent(path)?;
		if !parent.is_dir() {
			return Err(Error::NotDirectory);
		}
		let entry = self.lookup_entry(&parent, name)?;
		let mut target = self.inode(entry.ino);
		self.release_all_blocks(&mut target);
		self.free_inode(target.ino);
		self.remove_entry(&mut parent, name)?;
		Ok(())
	}

	/// Sets or clears `path`'s modification time.
	pub fn utimens(&mut self, path: &str, mtime: MTime) -> Result<()> {
		let mut inode = self.resolve(path)?;
		match mtime {
			MTime::Omit => {}
			MTime::Now => {
				let (sec, nsec) = now();
				inode.mtime_sec = sec;
				inode.mtime_nsec = nsec;
			}
			MTime::Set(sec, nsec) => {
				inode.mtime_sec = sec;
				inode.mtime_nsec = nsec;
			}
		}
		self.write_inode(&inode);
		Ok(())
	}

	/// Extends `inode` by `n` bytes: zero-fills the unused tail of its last block, allocates
	/// whatever further whole blocks the extension needs, and bumps `size`. Newly allocated
	/// blocks are already zeroed by the allocator, so holes read as zero with no extra work.
	fn add_bytes(&mut self, inode: &mut Inode, n: u64) -> Result<()> {
		if n == 0 {
			return Ok(());
		}
		let old_size = inode.size;
		let new_size = old_size + n;

		let used_in_last = if old_size == 0 { 0 } else { old_size % BLOCK_SIZE };
		if used_in_last != 0 {
			let (blk, _) = self.map_offset(inode, old_size - 1);
			self.block_mut(blk)[used_in_last as usize..].fill(0);
		}

		let old_blocks = old_size.div_ceil(BLOCK_SIZE);
		let new_blocks = new_size.div_ceil(BLOCK_SIZE);
		self.allocate_blocks(inode, (new_blocks - old_blocks) as u32)?;

		inode.size = new_size;
		self.write_inode(inode);
		Ok(())
	}

	/// Grows or shrinks the file at `path` to exactly `new_size` bytes.
	pub fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
		let mut inode = self.resolve(path)?;
		match new_size.cmp(&inode.size) {
			std::cmp::Ordering::Greater => {
				self.add_bytes(&mut inode, new_size - inode.size)?;
				self.touch(&mut inode);
				self.write_inode(&inode);
			}
			std::cmp::Ordering::Less => {
				let old_blocks = inode.size.div_ceil(BLOCK_SIZE);
				let new_blocks = new_size.div_ceil(BLOCK_SIZE);
				self.deallocate_blocks(&mut inode, (old_blocks - new_blocks) as u32);
				inode.size = new_size;
				self.touch(&mut inode);
				self.write_inode(&inode);
			}
			std::cmp::Ordering::Equal => {}
		}
		Ok(())
	}

	/// Reads up to `buf.len()` bytes from `path` starting at `offset`. Returns the number of
	/// bytes actually present before EOF; the rest of `buf` is zero-filled.
	pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
		let inode = self.resolve(path)?;
		if offset >= inode.size {
			return Ok(0);
		}
		let avail = (inode.size - offset).min(buf.len() as u64) as usize;
		let mut done = 0;
		while done < avail {
			let (blk, off) = self.map_offset(&inode, offset + done as u64);
			let chunk = (BLOCK_SIZE as usize - off).min(avail - done);
			buf[done..done + chunk].copy_from_slice(&self.block(blk)[off..off + chunk]);
			done += chunk;
		}
		buf[avail..].fill(0);
		Ok(avail)
	}

	/// Writes `buf` to `path` at `offset`, extending the file as needed. Returns `buf.len()`.
	pub fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		let mut inode = self.resolve(path)?;
		if inode.extent_block().is_none() {
			self.allocate_blocks(&mut inode, 0)?;
		}
		if offset > inode.size {
			self.add_bytes(&mut inode, offset - inode.size)?;
		}
		let end = offset + buf.len() as u64;
		if end > inode.size {
			self.add_bytes(&mut inode, end - inode.size)?;
		}

		let mut done = 0;
		while done < buf.len() {
			let (blk, off) = self.map_offset(&inode, offset + done as u64);
			let chunk = (BLOCK_SIZE as usize - off).min(buf.len() - done);
			self.block_mut(blk)[off..off + chunk].copy_from_slice(&buf[done..done + chunk]);
			done += chunk;
		}
		self.touch(&mut inode);
		self.write_inode(&inode);
		Ok(buf.len())
	}

	/// Tells whether `ino` is the root inode.
	pub fn is_root(ino: u32) -> bool {
		ino == ROOT_INO
	}
}
