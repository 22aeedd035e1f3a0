//! The image window: a base pointer plus a length giving access to the whole filesystem image
//! as an addressable byte array.
//!
//! The engine never assumes its backing store is a real memory mapping; it only requires
//! `AsRef<[u8]> + AsMut<[u8]>`. This mirrors the teacher's `FSFactory` trait abstracting over
//! "a `File`-like thing" rather than committing to one concrete I/O type: the production binary
//! maps a real file with `memmap2`, while tests run the exact same engine over a boxed slice.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use memmap2::MmapMut;

/// A backing store for a filesystem image: a flat byte array the engine reads and mutates
/// in place.
pub trait ImageStore: AsRef<[u8]> + AsMut<[u8]> {}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ImageStore for T {}

/// A memory-mapped filesystem image.
///
/// Acquired once at mount (scoped acquisition with guaranteed unmap on drop) and released when
/// the engine is destroyed.
pub struct Image {
	mmap: MmapMut,
}

impl Image {
	/// Maps the whole of the file at `path` read-write.
	pub fn open(path: &Path) -> io::Result<Self> {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		let mmap = unsafe { MmapMut::map_mut(&file)? };
		Ok(Self { mmap })
	}

	/// Returns the size of the image in bytes.
	pub fn len(&self) -> usize {
		self.mmap.len()
	}

	/// Tells whether the image is empty (zero bytes). Only meaningful for malformed images; a
	/// real a1fs image is always at least one block.
	pub fn is_empty(&self) -> bool {
		self.mmap.is_empty()
	}
}

impl AsRef<[u8]> for Image {
	fn as_ref(&self) -> &[u8] {
		&self.mmap
	}
}

impl AsMut<[u8]> for Image {
	fn as_mut(&mut self) -> &mut [u8] {
		&mut self.mmap
	}
}

/// An in-memory backing store, used by tests in place of a real mapped file.
pub struct MemImage(pub Vec<u8>);

impl AsRef<[u8]> for MemImage {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl AsMut<[u8]> for MemImage {
	fn as_mut(&mut self) -> &mut [u8] {
		&mut self.0
	}
}
