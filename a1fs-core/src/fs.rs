//! The filesystem context: owns the mapped image and exposes the low-level accessors every
//! other component builds on (superblock, inode table, data blocks, bitmaps).
//!
//! One `FileSystem` is one opaque per-mount context, as in the teacher's per-device `fs_ctx`.
//! No process-wide state is kept; several `FileSystem`s over different images can coexist.

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::image::ImageStore;
use crate::layout::{Inode, Superblock, BLOCK_SIZE};

/// A mounted a1fs filesystem.
pub struct FileSystem<I: ImageStore> {
	image: I,
}

impl<I: ImageStore> FileSystem<I> {
	/// Wraps an already-formatted image. Fails if the superblock's magic doesn't match.
	pub fn new(image: I) -> Result<Self> {
		let fs = Self { image };
		if !fs.superblock().is_formatted() {
			return Err(Error::Io(std::io::Error::new(
				std::io::ErrorKind::InvalidData,
				"image is not formatted as a1fs",
			)));
		}
		Ok(fs)
	}

	/// Consumes the filesystem, returning its backing store.
	pub fn into_inner(self) -> I {
		self.image
	}

	fn bytes(&self) -> &[u8] {
		self.image.as_ref()
	}

	fn bytes_mut(&mut self) -> &mut [u8] {
		self.image.as_mut()
	}

	/// Reads a fresh copy of the superblock.
	pub fn superblock(&self) -> Superblock {
		Superblock::read(self.bytes())
	}

	/// Persists an updated superblock.
	pub fn write_superblock(&mut self, sb: &Superblock) {
		sb.write(self.bytes_mut());
	}

	/// Reads inode `ino` from the inode table.
	pub fn inode(&self, ino: u32) -> Inode {
		let sb = self.superblock();
		Inode::read(self.bytes(), &sb, ino)
	}

	/// Persists an inode record (indexed by its own `ino` field).
	pub fn write_inode(&mut self, inode: &Inode) {
		let sb = self.superblock();
		inode.write(self.bytes_mut(), &sb, inode.ino);
	}

	fn block_offset(sb: &Superblock, data_blk: u32) -> usize {
		(sb.first_data_block as u64 + data_blk as u64) as usize * BLOCK_SIZE as usize
	}

	/// Returns the contents of data block `data_blk` (relative to the start of the data
	/// region).
	pub fn block(&self, data_blk: u32) -> &[u8] {
		let sb = self.superblock();
		let off = Self::block_offset(&sb, data_blk);
		&self.bytes()[off..off + BLOCK_SIZE as usize]
	}

	/// Returns a mutable view of data block `data_blk`.
	pub fn block_mut(&mut self, data_blk: u32) -> &mut [u8] {
		let sb = self.superblock();
		let off = Self::block_offset(&sb, data_blk);
		&mut self.bytes_mut()[off..off + BLOCK_SIZE as usize]
	}

	/// Zero-fills data block `data_blk` in its entirety.
	pub fn zero_block(&mut self, data_blk: u32) {
		self.block_mut(data_blk).fill(0);
	}

	/// Borrows the inode bitmap.
	pub fn inode_bitmap(&mut self) -> Bitmap<'_> {
		let sb = self.superblock();
		let off = sb.inode_bitmap_block as usize * BLOCK_SIZE as usize;
		let n_bits = sb.inodes_count as usize;
		let len = n_bits.div_ceil(8);
		Bitmap::new(&mut self.bytes_mut()[off..off + len], n_bits)
	}

	/// Borrows the data bitmap.
	pub fn data_bitmap(&mut self) -> Bitmap<'_> {
		let sb = self.superblock();
		let off = sb.data_bitmap_block as usize * BLOCK_SIZE as usize;
		let n_bits = (sb.blocks_count - sb.reserved_blocks) as usize;
		let len = n_bits.div_ceil(8);
		Bitmap::new(&mut self.bytes_mut()[off..off + len], n_bits)
	}
}
