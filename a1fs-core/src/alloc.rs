//! Inode allocation and the extent-backed per-inode block allocator.
//!
//! The bitmap allocator ([`crate::bitmap::Bitmap`]) only knows about bits; it is this module's
//! job to keep the superblock's free counters and the zero-fill-on-allocate guarantee in sync
//! with every bit it flips, which is what makes the free counts trustworthy across any sequence
//! of operations.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::image::ImageStore;
use crate::layout::{Extent, Inode, MAX_EXTENTS};

impl<I: ImageStore> FileSystem<I> {
	/// Sets inode bit `ino`, decrementing the free-inode counter.
	fn set_inode_bit(&mut self, ino: u32) {
		self.inode_bitmap().set(ino as usize);
		let mut sb = self.superblock();
		sb.free_inodes -= 1;
		self.write_superblock(&sb);
	}

	/// Clears inode bit `ino`, incrementing the free-inode counter.
	fn clear_inode_bit(&mut self, ino: u32) {
		self.inode_bitmap().clear(ino as usize);
		let mut sb = self.superblock();
		sb.free_inodes += 1;
		self.write_superblock(&sb);
	}

	/// Sets data bit `blk`, decrementing the free-block counter and zero-filling the block.
	fn set_data_bit(&mut self, blk: u32) {
		self.data_bitmap().set(blk as usize);
		let mut sb = self.superblock();
		sb.free_blocks -= 1;
		self.write_superblock(&sb);
		self.zero_block(blk);
	}

	/// Clears data bit `blk`, incrementing the free-block counter.
	fn clear_data_bit(&mut self, blk: u32) {
		self.data_bitmap().clear(blk as usize);
		let mut sb = self.superblock();
		sb.free_blocks += 1;
		self.write_superblock(&sb);
	}

	/// Allocates a fresh inode number. The caller must initialize every field of the returned
	/// record before any path lookup can observe it.
	pub fn alloc_inode(&mut self) -> Result<u32> {
		let (ino, _) = self.inode_bitmap().find_run(1)?;
		self.set_inode_bit(ino as u32);
		Ok(ino as u32)
	}

	/// Frees inode `ino`. The caller must have already released its extent list and extent
	/// block.
	pub fn free_inode(&mut self, ino: u32) {
		self.clear_inode_bit(ino);
	}

	/// Reads the live extent list of `inode`.
	pub fn read_extents(&self, inode: &Inode) -> Vec<Extent> {
		let Some(blk) = inode.extent_block() else {
			return Vec::new();
		};
		let block = self.block(blk);
		(0..inode.num_extents as usize).map(|i| Extent::read(block, i)).collect()
	}

	/// Writes back `extents` as `inode`'s extent list. `inode` must already have an extent
	/// block (see [`Self::allocate_blocks`]).
	fn write_extents(&mut self, inode: &mut Inode, extents: &[Extent]) {
		let blk = inode.extent_block().expect("inode has no extent block");
		let block = self.block_mut(blk);
		for (i, ext) in extents.iter().enumerate() {
			ext.write(block, i);
		}
		inode.num_extents = extents.len() as u16;
	}

	/// Grows `inode` by `n` data blocks, appending one or more extents to its extent list.
	///
	/// If `n` is `0` but the inode has no extent block yet, one is allocated so the inode has a
	/// valid but empty extent list. Fails with [`Error::NoSpace`] if `n` exceeds the number of
	/// free data blocks, or if satisfying the request would need more extents than the 512-extent
	/// cap allows.
	pub fn allocate_blocks(&mut self, inode: &mut Inode, n: u32) -> Result<()> {
		if inode.extent_block().is_none() {
			let (blk, _) = self.data_bitmap().find_run(1)?;
			let blk = blk as u32;
			self.set_data_bit(blk);
			inode.set_extent_block(Some(blk));
			self.write_inode(inode);
		}
		if n == 0 {
			return Ok(());
		}

		let sb = self.superblock();
		if n > sb.free_blocks {
			return Err(Error::NoSpace);
		}

		let mut extents = self.read_extents(inode);
		let mut remaining = n;
		while remaining > 0 {
			if extents.len() >= MAX_EXTENTS {
				self.write_extents(inode, &extents);
				self.write_inode(inode);
				return Err(Error::NoSpace);
			}
			let (start, count) = self.data_bitmap().find_run(remaining as usize)?;
			for b in start..start + count {
				self.set_data_bit(b as u32);
			}
			extents.push(Extent { start: start as u32, count: count as u32 });
			remaining -= count as u32;
		}

		self.write_extents(inode, &extents);
		self.write_inode(inode);
		Ok(())
	}

	/// Shrinks `inode` by `n` data blocks, releasing them from the tail of its extent list. The
	/// extent block itself is kept until the inode is destroyed.
	pub fn deallocate_blocks(&mut self, inode: &mut Inode, n: u32) {
		if inode.extent_block().is_none() {
			return;
		}
		let mut extents = self.read_extents(inode);
		let mut remaining = n;
		while remaining > 0 {
			let Some(last) = extents.last_mut() else {
				break;
			};
			if last.count <= remaining {
				let freed = *last;
				extents.pop();
				for b in freed.start..freed.start + freed.count {
					self.clear_data_bit(b);
				}
				remaining -= freed.count;
			} else {
				let new_count = last.count - remaining;
				let freed_start = last.start + new_count;
				let freed_count = remaining;
				last.count = new_count;
				for b in freed_start..freed_start + freed_count {
					self.clear_data_bit(b);
				}
				remaining = 0;
			}
		}
		self.write_extents(inode, &extents);
		self.write_inode(inode);
	}

	/// Maps a logical byte offset within `inode`'s content to a `(data block, in-block offset)`
	/// pair by walking its extents in order. Panics if `offset` is beyond the inode's allocated
	/// blocks — callers must only ask for offsets within `inode.size`, rounded up to a whole
	/// block.
	pub fn map_offset(&self, inode: &Inode, offset: u64) -> (u32, usize) {
		let mut remaining = offset / crate::layout::BLOCK_SIZE;
		for ext in self.read_extents(inode) {
			if remaining < ext.count as u64 {
				return (ext.start + remaining as u32, (offset % crate::layout::BLOCK_SIZE) as usize);
			}
			remaining -= ext.count as u64;
		}
		panic!("offset beyond inode's allocated blocks");
	}

	/// Releases an inode's extent block and every block it still owns. Used by `unlink` and
	/// `rmdir`.
	pub fn release_all_blocks(&mut self, inode: &mut Inode) {
		let total: u32 = self.read_extents(inode).iter().map(|e| e.count).sum();
		self.deallocate_blocks(inode, total);
		if let Some(blk) = inode.extent_block() {
			self.clear_data_bit(blk);
			inode.set_extent_block(None);
			self.write_inode(inode);
		}
	}
}
