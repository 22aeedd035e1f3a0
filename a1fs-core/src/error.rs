//! The engine's error taxonomy.
//!
//! Every fallible operation in this crate returns [`Error`] rather than a raw errno, so that
//! callers (the formatter, the FUSE adapter, the test suite) each map it to whatever their own
//! boundary expects.

use std::fmt;
use std::io;

/// An error produced by the filesystem engine.
#[derive(Debug)]
pub enum Error {
	/// A path's length reached or exceeded the path-length limit.
	NameTooLong,
	/// A path component could not be found.
	NotFound,
	/// A non-final path component is not a directory.
	NotDirectory,
	/// `rmdir` was called on a directory that still has entries.
	NotEmpty,
	/// An allocator has no free bit, or no run long enough, to satisfy a request.
	NoSpace,
	/// The operation is not implemented by this engine.
	Unsupported,
	/// A lower-level I/O failure (mapping the image, reading/writing the backing file).
	Io(io::Error),
}

impl Error {
	/// Maps this error to the raw errno value the host expects a FUSE callback to return.
	pub fn to_errno(&self) -> i32 {
		match self {
			Self::NameTooLong => libc::ENAMETOOLONG,
			Self::NotFound => libc::ENOENT,
			Self::NotDirectory => libc::ENOTDIR,
			Self::NotEmpty => libc::ENOTEMPTY,
			Self::NoSpace => libc::ENOSPC,
			Self::Unsupported => libc::ENOSYS,
			Self::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NameTooLong => write!(f, "name too long"),
			Self::NotFound => write!(f, "no such file or directory"),
			Self::NotDirectory => write!(f, "not a directory"),
			Self::NotEmpty => write!(f, "directory not empty"),
			Self::NoSpace => write!(f, "no space left on device"),
			Self::Unsupported => write!(f, "operation not supported"),
			Self::Io(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// Shorthand for a [`Result`] with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
