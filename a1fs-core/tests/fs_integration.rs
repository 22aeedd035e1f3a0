//! End-to-end coverage of the engine driven in-process, without a real FUSE mount — the same
//! approach the teacher's own crates use for testing disk-backed logic against a plain buffer.

use a1fs_core::ops::MTime;
use a1fs_core::{FileSystem, MemImage};

const MIB: u64 = 1024 * 1024;

fn fresh(size: u64, inodes: u32) -> FileSystem<MemImage> {
	let mut buf = vec![0u8; size as usize];
	a1fs_core::format::format(&mut buf, inodes, false, true).unwrap();
	FileSystem::new(MemImage(buf)).unwrap()
}

fn free_counts<I: a1fs_core::ImageStore>(fs: &mut FileSystem<I>) -> (u32, u32) {
	let sb = fs.superblock();
	assert_eq!(sb.free_inodes as usize, fs.inode_bitmap().count_free());
	assert_eq!(sb.free_blocks as usize, fs.data_bitmap().count_free());
	(sb.free_inodes, sb.free_blocks)
}

#[test]
fn root_persists_after_format() {
	let mut fs = fresh(MIB, 32);
	let attr = fs.get_attr("/").unwrap();
	assert_eq!(attr.ino, 0);
	assert!(attr.mode & a1fs_core::layout::S_IFDIR != 0);
	assert_eq!(attr.links, 2);
	assert_eq!(attr.size, 0);
	free_counts(&mut fs);
}

#[test]
fn mkdir_updates_parent_links() {
	let mut fs = fresh(MIB, 32);
	fs.mkdir("/a", 0o755).unwrap();

	let a = fs.get_attr("/a").unwrap();
	assert!(a.mode & a1fs_core::layout::S_IFDIR != 0);
	assert_eq!(a.links, 2);

	let root = fs.get_attr("/").unwrap();
	assert_eq!(root.links, 3);

	let entries = fs.read_dir("/").unwrap();
	assert!(entries.contains(&"a".to_string()));
	free_counts(&mut fs);
}

#[test]
fn create_write_read_roundtrip() {
	let mut fs = fresh(MIB, 32);
	fs.mkdir("/a", 0o755).unwrap();
	fs.create("/a/f", 0o644).unwrap();

	let n = fs.write("/a/f", b"hello", 0).unwrap();
	assert_eq!(n, 5);

	let mut buf = [0u8; 5];
	let n = fs.read("/a/f", &mut buf, 0).unwrap();
	assert_eq!(n, 5);
	assert_eq!(&buf, b"hello");

	let attr = fs.get_attr("/a/f").unwrap();
	assert_eq!(attr.size, 5);
	free_counts(&mut fs);
}

#[test]
fn truncate_grow_zero_fills_tail() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	fs.write("/f", b"hello", 0).unwrap();

	fs.truncate("/f", 8192).unwrap();
	let attr = fs.get_attr("/f").unwrap();
	assert_eq!(attr.size, 8192);

	let mut buf = [0xffu8; 10];
	fs.read("/f", &mut buf, 5).unwrap();
	assert_eq!(buf, [0u8; 10]);
	free_counts(&mut fs);
}

#[test]
fn write_past_end_extends_with_hole() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	fs.write("/f", b"hello", 0).unwrap();
	fs.truncate("/f", 8192).unwrap();

	fs.write("/f", b"X", 10000).unwrap();
	let attr = fs.get_attr("/f").unwrap();
	assert_eq!(attr.size, 10001);

	let mut zero = [0xffu8; 1];
	fs.read("/f", &mut zero, 9999).unwrap();
	assert_eq!(zero, [0u8]);

	let mut x = [0u8; 1];
	fs.read("/f", &mut x, 10000).unwrap();
	assert_eq!(x, [b'X']);
	free_counts(&mut fs);
}

#[test]
fn truncate_is_idempotent() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	fs.write("/f", b"hello world", 0).unwrap();

	fs.truncate("/f", 4).unwrap();
	let after_one = fs.get_attr("/f").unwrap();
	fs.truncate("/f", 4).unwrap();
	let after_two = fs.get_attr("/f").unwrap();

	assert_eq!(after_one.size, after_two.size);
	assert_eq!(after_one.blocks_512, after_two.blocks_512);
	free_counts(&mut fs);
}

#[test]
fn blocks_512_reflects_allocated_blocks_not_logical_size() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	fs.truncate("/f", 5000).unwrap();

	let attr = fs.get_attr("/f").unwrap();
	assert_eq!(attr.size, 5000);
	// 5000 bytes needs 2 whole 4096-byte blocks, i.e. 16 sectors, not div_ceil(5000, 512) = 10.
	assert_eq!(attr.blocks_512, 16);
	free_counts(&mut fs);
}

#[test]
fn delete_reclaims_free_space() {
	let mut fs = fresh(MIB, 32);
	let (inodes_before, blocks_before) = free_counts(&mut fs);

	fs.mkdir("/a", 0o755).unwrap();
	fs.create("/a/f", 0o644).unwrap();
	fs.write("/a/f", &[1u8; 9000], 0).unwrap();

	fs.unlink("/a/f").unwrap();
	fs.rmdir("/a").unwrap();

	let (inodes_after, blocks_after) = free_counts(&mut fs);
	assert_eq!(inodes_before, inodes_after);
	assert_eq!(blocks_before, blocks_after);
}

#[test]
fn rmdir_rejects_nonempty_directory() {
	let mut fs = fresh(MIB, 32);
	fs.mkdir("/a", 0o755).unwrap();
	fs.create("/a/f", 0o644).unwrap();

	let err = fs.rmdir("/a").unwrap_err();
	assert!(matches!(err, a1fs_core::Error::NotEmpty));
}

#[test]
fn lookup_missing_component_fails() {
	let fs = fresh(MIB, 32);
	let err = fs.get_attr("/nope").unwrap_err();
	assert!(matches!(err, a1fs_core::Error::NotFound));
}

#[test]
fn non_directory_in_path_fails() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	let err = fs.get_attr("/f/nested").unwrap_err();
	assert!(matches!(err, a1fs_core::Error::NotDirectory));
}

#[test]
fn rmdir_and_unlink_reject_non_directory_parent() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();

	let err = fs.rmdir("/f/sub").unwrap_err();
	assert!(matches!(err, a1fs_core::Error::NotDirectory));

	let err = fs.unlink("/f/sub").unwrap_err();
	assert!(matches!(err, a1fs_core::Error::NotDirectory));
}

#[test]
fn utimens_omit_leaves_mtime_unchanged() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	let before = fs.get_attr("/f").unwrap();

	fs.utimens("/f", MTime::Omit).unwrap();
	let after = fs.get_attr("/f").unwrap();

	assert_eq!(before.mtime_sec, after.mtime_sec);
	assert_eq!(before.mtime_nsec, after.mtime_nsec);
}

#[test]
fn utimens_set_applies_exact_time() {
	let mut fs = fresh(MIB, 32);
	fs.create("/f", 0o644).unwrap();
	fs.utimens("/f", MTime::Set(1234, 5678)).unwrap();
	let attr = fs.get_attr("/f").unwrap();
	assert_eq!(attr.mtime_sec, 1234);
	assert_eq!(attr.mtime_nsec, 5678);
}

#[test]
fn stat_fs_reflects_format_parameters() {
	let mut fs = fresh(MIB, 32);
	let st = fs.stat_fs();
	assert_eq!(st.block_size, 4096);
	assert_eq!(st.total_inodes, 32);
	assert_eq!(st.free_inodes, 31);
	assert_eq!(st.total_blocks, MIB / 4096);
	free_counts(&mut fs);
}

#[test]
fn directory_growth_spans_multiple_blocks() {
	let mut fs = fresh(MIB, 512);
	fs.mkdir("/a", 0o755).unwrap();
	// One block holds 4096 / 256 = 16 entries; cross that boundary.
	for i in 0..20 {
		fs.create(&format!("/a/f{i}"), 0o644).unwrap();
	}
	let entries = fs.read_dir("/a").unwrap();
	// "." and ".." plus 20 created files.
	assert_eq!(entries.len(), 22);
	free_counts(&mut fs);
}
