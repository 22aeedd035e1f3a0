//! This module implements utility functions.

use std::fmt;
use std::mem::size_of;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current timestamp since the Unix epoch.
pub fn get_timestamp() -> Duration {
    SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock panic!")
}

/// Performs the log2 operatin on the given integer.
///
/// If the result is undefined, the function returns None.
pub fn log2(n: u64) -> Option<u64> {
	let num_bits = (size_of::<u64>() * 8) as u64;

	let n = num_bits - n.leading_zeros() as u64;
	if n > 0 {
		Some(n - 1)
	} else {
		None
	}
}

/// Returns `2^n`.
pub fn pow2(n: u32) -> u64 {
	1u64 << n
}

/// Returns `ceil(n / d)`.
pub fn ceil_division<T>(n: T, d: T) -> T
where
	T: Copy
		+ std::ops::Add<Output = T>
		+ std::ops::Sub<Output = T>
		+ std::ops::Div<Output = T>
		+ From<u8>,
{
	(n + d - T::from(1u8)) / d
}

/// Reinterprets the given value as a slice of bytes.
///
/// The caller must ensure `T` has no padding bytes that would be observable, and that reading
/// uninitialized padding is acceptable for the use case (writing the bytes back out to disk).
pub fn reinterpret<T>(val: &T) -> &[u8] {
	unsafe { std::slice::from_raw_parts(val as *const T as *const u8, size_of::<T>()) }
}

/// Reinterprets the given value as a mutable slice of bytes. See [`reinterpret`].
pub fn reinterpret_mut<T>(val: &mut T) -> &mut [u8] {
	unsafe { std::slice::from_raw_parts_mut(val as *mut T as *mut u8, size_of::<T>()) }
}

/// Structure representing a number of bytes.
pub struct ByteSize(pub u64);

impl ByteSize {
	/// Creates a size from a given number of sectors.
	pub fn from_sectors_count(cnt: u64) -> Self {
		Self(cnt * 512)
	}
}

impl fmt::Display for ByteSize {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut order = log2(self.0).unwrap_or(0) / log2(1024).unwrap();

		let suffix = match order {
			0 => "bytes",
			1 => "KiB",
			2 => "MiB",
			3 => "GiB",
			4 => "TiB",
			5 => "PiB",
			6 => "EiB",
			7 => "ZiB",
			8 => "YiB",

			_ => {
				order = 0;
				"bytes"
			}
		};

		let unit = 1024usize.pow(order as u32);
		let nbr = self.0 / unit as u64;

		write!(fmt, "{} {}", nbr, suffix)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn bytesize() {
		assert_eq!(format!("{}", ByteSize(0)).as_str(), "0 bytes");
		assert_eq!(format!("{}", ByteSize(1)).as_str(), "1 bytes");
		assert_eq!(format!("{}", ByteSize(1023)).as_str(), "1023 bytes");
		assert_eq!(format!("{}", ByteSize(1024)).as_str(), "1 KiB");
		assert_eq!(format!("{}", ByteSize(1025)).as_str(), "1 KiB");
		assert_eq!(format!("{}", ByteSize(2048)).as_str(), "2 KiB");
		assert_eq!(format!("{}", ByteSize(1024 * 1024)).as_str(), "1 MiB");
		assert_eq!(
			format!("{}", ByteSize(1024 * 1024 * 1024)).as_str(),
			"1 GiB"
		);
		assert_eq!(
			format!("{}", ByteSize(1024 * 1024 * 1024 * 1024)).as_str(),
			"1 TiB"
		);
	}

	#[test]
	fn ceil_division_basic() {
		assert_eq!(ceil_division(0u64, 4), 0);
		assert_eq!(ceil_division(1u64, 4), 1);
		assert_eq!(ceil_division(4u64, 4), 1);
		assert_eq!(ceil_division(5u64, 4), 2);
	}

	#[test]
	fn log2_pow2_roundtrip() {
		for shift in 0..20u32 {
			assert_eq!(log2(pow2(shift)), Some(shift as u64));
		}
	}
}
