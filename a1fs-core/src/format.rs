//! The formatter: lays out a fresh, empty filesystem across an image buffer.
//!
//! Grounded on the teacher's `Ext2Factory::create` (`mkfs/src/ext2.rs`), which computes region
//! sizes from the requested inode count and writes out a superblock, bitmaps and a root record in
//! one pass — the same shape this formatter follows for a1fs's simpler, single-inode-table
//! layout.

use std::mem::size_of;

use utils::util::ceil_division;

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::layout::{Inode, Superblock, BLOCK_SIZE, S_IFDIR};

/// Computed block offsets and counts for a freshly laid-out image.
struct Layout {
	blocks_count: u32,
	reserved_blocks: u32,
	data_bitmap_block: u32,
	inode_bitmap_block: u32,
	inode_table_block: u32,
	first_data_block: u32,
	data_blocks: u32,
}

fn compute_layout(image_size: u64, inode_count: u32) -> Result<Layout> {
	let blocks = image_size / BLOCK_SIZE;
	let inode_table_blocks = ceil_division(inode_count as u64 * size_of::<Inode>() as u64, BLOCK_SIZE);
	let inode_bitmap_blocks = ceil_division(inode_count as u64, 8 * BLOCK_SIZE);

	let remaining = blocks
		.checked_sub(1 + inode_table_blocks + inode_bitmap_blocks)
		.filter(|r| *r >= 2)
		.ok_or(Error::NoSpace)?;

	// `ceil(remaining / (8 * block_size + 1))` sizes the data bitmap from the region it must
	// itself fit inside, without the self-coverage subtraction underflowing for small images
	// (see the design note on `resv_blocks_count`).
	let data_bitmap_blocks = ceil_division(remaining, 8 * BLOCK_SIZE + 1);
	let data_blocks = remaining - data_bitmap_blocks;

	let data_bitmap_block = 1;
	let inode_bitmap_block = data_bitmap_block + data_bitmap_blocks as u32;
	let inode_table_block = inode_bitmap_block + inode_bitmap_blocks as u32;
	let first_data_block = inode_table_block + inode_table_blocks as u32;

	Ok(Layout {
		blocks_count: blocks as u32,
		reserved_blocks: first_data_block,
		data_bitmap_block,
		inode_bitmap_block,
		inode_table_block,
		first_data_block,
		data_blocks: data_blocks as u32,
	})
}

/// Initializes an empty a1fs filesystem across `image`.
///
/// Refuses to overwrite an already-formatted image unless `force` is set. If `zero` is set, the
/// whole image is pre-zeroed before the new layout is written (otherwise only the bitmap and
/// inode-0 regions are, since those are the only regions whose prior contents would otherwise be
/// observable as stale data).
pub fn format(image: &mut [u8], inode_count: u32, force: bool, zero: bool) -> Result<()> {
	if image.len() < size_of::<Superblock>() {
		return Err(Error::Io(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			"image is too small to hold a superblock",
		)));
	}
	if inode_count == 0 {
		return Err(Error::NoSpace);
	}
	if !force && Superblock::read(image).is_formatted() {
		return Err(Error::Io(std::io::Error::new(
			std::io::ErrorKind::AlreadyExists,
			"image is already formatted; pass force to overwrite",
		)));
	}
	if zero {
		image.fill(0);
	}

	let layout = compute_layout(image.len() as u64, inode_count)?;

	let sb = Superblock {
		magic: crate::layout::MAGIC,
		size: image.len() as u64,
		inodes_count: inode_count,
		blocks_count: layout.blocks_count,
		reserved_blocks: layout.reserved_blocks,
		free_inodes: inode_count - 1,
		free_blocks: layout.data_blocks,
		inode_bitmap_block: layout.inode_bitmap_block,
		inode_table_block: layout.inode_table_block,
		data_bitmap_block: layout.data_bitmap_block,
		first_data_block: layout.first_data_block,
	};
	sb.write(image);

	let data_bitmap_off = layout.data_bitmap_block as usize * BLOCK_SIZE as usize;
	let data_bitmap_len = (layout.data_blocks as usize).div_ceil(8);
	Bitmap::new(&mut image[data_bitmap_off..], layout.data_blocks as usize).clear_range(0, layout.data_blocks as usize);
	image[data_bitmap_off + data_bitmap_len
		..layout.inode_bitmap_block as usize * BLOCK_SIZE as usize]
		.fill(0);

	let inode_bitmap_off = layout.inode_bitmap_block as usize * BLOCK_SIZE as usize;
	let inode_bitmap_len = (inode_count as usize).div_ceil(8);
	Bitmap::new(&mut image[inode_bitmap_off..], inode_count as usize).clear_range(0, inode_count as usize);
	image[inode_bitmap_off + inode_bitmap_len
		..layout.inode_table_block as usize * BLOCK_SIZE as usize]
		.fill(0);
	Bitmap::new(&mut image[inode_bitmap_off..], inode_count as usize).set(0);

	let mut root = Inode::empty(0);
	root.mode = S_IFDIR | 0o777;
	root.links = 2;
	let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
	root.mtime_sec = now.as_secs() as i64;
	root.mtime_nsec = now.subsec_nanos() as i64;
	root.write(image, &sb, 0);

	Ok(())
}
