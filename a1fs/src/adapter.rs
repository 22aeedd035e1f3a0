//! Adapts an [`a1fs_core::FileSystem`] to `fuser`'s host callback trait.
//!
//! The engine is entirely path-addressed (see `a1fs-core`'s operations layer), but FUSE hands
//! most callbacks an opaque inode number instead of a path. This adapter bridges the two with a
//! small `ino -> path` cache seeded with the root and grown by every `lookup`/`readdir` that
//! discovers a new entry, rather than teaching the engine a second, inode-keyed API.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fuser::{
	FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
	ReplyEntry, ReplyStatfs, ReplyWrite, Request,
};

use a1fs_core::image::Image;
use a1fs_core::layout::BLOCK_SIZE;
use a1fs_core::ops::{Attr, MTime};
use a1fs_core::FileSystem;

/// Attribute and directory-entry cache lifetime handed back to the kernel. The image never
/// changes out from under us except through this same process, so a generous TTL is safe.
const TTL: Duration = Duration::from_secs(1);

/// FUSE reserves inode 1 for the mount root; a1fs's root lives at inode 0.
fn to_fuse_ino(a1fs_ino: u32) -> u64 {
	a1fs_ino as u64 + 1
}

fn to_a1fs_ino(fuse_ino: u64) -> u32 {
	(fuse_ino - 1) as u32
}

fn mode_to_kind(mode: u32) -> FileType {
	if mode & a1fs_core::layout::S_IFDIR == a1fs_core::layout::S_IFDIR {
		FileType::Directory
	} else {
		FileType::RegularFile
	}
}

fn to_file_attr(attr: &Attr) -> FileAttr {
	let kind = mode_to_kind(attr.mode);
	let mtime = std::time::UNIX_EPOCH
		+ Duration::from_secs(attr.mtime_sec.max(0) as u64)
		+ Duration::from_nanos(attr.mtime_nsec.max(0) as u64);
	FileAttr {
		ino: to_fuse_ino(attr.ino),
		size: attr.size,
		blocks: attr.blocks_512,
		atime: mtime,
		mtime,
		ctime: mtime,
		crtime: mtime,
		kind,
		perm: (attr.mode & 0o7777) as u16,
		nlink: attr.links,
		uid: 0,
		gid: 0,
		rdev: 0,
		blksize: BLOCK_SIZE as u32,
		flags: 0,
	}
}

/// Wraps the engine and the path resolution cache the FUSE trait requires.
pub struct Driver {
	fs: FileSystem<Image>,
	paths: HashMap<u64, PathBuf>,
}

impl Driver {
	pub fn new(fs: FileSystem<Image>) -> Self {
		let mut paths = HashMap::new();
		paths.insert(to_fuse_ino(0), PathBuf::from("/"));
		Self { fs, paths }
	}

	fn path_of(&self, ino: u64) -> Option<&Path> {
		self.paths.get(&ino).map(PathBuf::as_path)
	}

	fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
		let mut p = self.path_of(parent)?.to_path_buf();
		p.push(name);
		Some(p)
	}

	fn remember(&mut self, path: PathBuf, ino: u32) {
		self.paths.insert(to_fuse_ino(ino), path);
	}
}

impl Filesystem for Driver {
	fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
		let Some(path) = self.child_path(parent, name) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.get_attr(&path_str) {
			Ok(attr) => {
				self.remember(path, attr.ino);
				reply.entry(&TTL, &to_file_attr(&attr), 0);
			}
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
		let Some(path) = self.path_of(ino) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.get_attr(&path_str) {
			Ok(attr) => reply.attr(&TTL, &to_file_attr(&attr)),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn setattr(
		&mut self,
		_req: &Request,
		ino: u64,
		_mode: Option<u32>,
		_uid: Option<u32>,
		_gid: Option<u32>,
		size: Option<u64>,
		_atime: Option<fuser::TimeOrNow>,
		mtime: Option<fuser::TimeOrNow>,
		_ctime: Option<std::time::SystemTime>,
		_fh: Option<u64>,
		_crtime: Option<std::time::SystemTime>,
		_chgtime: Option<std::time::SystemTime>,
		_bkuptime: Option<std::time::SystemTime>,
		_flags: Option<u32>,
		reply: ReplyAttr,
	) {
		let Some(path) = self.path_of(ino).map(Path::to_path_buf) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();

		if let Some(new_size) = size {
			if let Err(e) = self.fs.truncate(&path_str, new_size) {
				reply.error(e.to_errno());
				return;
			}
		}
		if let Some(spec) = mtime {
			let setting = match spec {
				fuser::TimeOrNow::Now => MTime::Now,
				fuser::TimeOrNow::SpecificTime(t) => {
					let d = t.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
					MTime::Set(d.as_secs() as i64, d.subsec_nanos() as i64)
				}
			};
			if let Err(e) = self.fs.utimens(&path_str, setting) {
				reply.error(e.to_errno());
				return;
			}
		}

		match self.fs.get_attr(&path_str) {
			Ok(attr) => reply.attr(&TTL, &to_file_attr(&attr)),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn readdir(&mut self, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
		let Some(path) = self.path_of(ino).map(Path::to_path_buf) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		let names = match self.fs.read_dir(&path_str) {
			Ok(n) => n,
			Err(e) => {
				reply.error(e.to_errno());
				return;
			}
		};

		for (i, name) in names.iter().enumerate().skip(offset as usize) {
			let (child_path, kind, child_ino) = match name.as_str() {
				"." => (path.clone(), FileType::Directory, to_a1fs_ino(ino)),
				".." => {
					let parent_path = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
					let parent_str = parent_path.to_string_lossy().into_owned();
					match self.fs.get_attr(&parent_str) {
						Ok(attr) => (parent_path, FileType::Directory, attr.ino),
						Err(_) => (path.clone(), FileType::Directory, to_a1fs_ino(ino)),
					}
				}
				_ => {
					let mut p = path.clone();
					p.push(name);
					let p_str = p.to_string_lossy().into_owned();
					match self.fs.get_attr(&p_str) {
						Ok(attr) => (p, mode_to_kind(attr.mode), attr.ino),
						Err(_) => continue,
					}
				}
			};
			self.remember(child_path, child_ino);
			let full = reply.add(to_fuse_ino(child_ino), (i + 1) as i64, kind, name);
			if full {
				break;
			}
		}
		reply.ok();
	}

	fn mkdir(&mut self, _req: &Request, parent: u64, name: &OsStr, mode: u32, _umask: u32, reply: ReplyEntry) {
		let Some(path) = self.child_path(parent, name) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.mkdir(&path_str, mode) {
			Ok(()) => match self.fs.get_attr(&path_str) {
				Ok(attr) => {
					self.remember(path, attr.ino);
					reply.entry(&TTL, &to_file_attr(&attr), 0);
				}
				Err(e) => reply.error(e.to_errno()),
			},
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
		let Some(path) = self.child_path(parent, name) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.rmdir(&path_str) {
			Ok(()) => reply.ok(),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn create(
		&mut self,
		_req: &Request,
		parent: u64,
		name: &OsStr,
		mode: u32,
		_umask: u32,
		flags: i32,
		reply: ReplyCreate,
	) {
		let Some(path) = self.child_path(parent, name) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.create(&path_str, mode) {
			Ok(()) => match self.fs.get_attr(&path_str) {
				Ok(attr) => {
					self.remember(path, attr.ino);
					reply.created(&TTL, &to_file_attr(&attr), 0, 0, flags as u32);
				}
				Err(e) => reply.error(e.to_errno()),
			},
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
		let Some(path) = self.child_path(parent, name) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.unlink(&path_str) {
			Ok(()) => reply.ok(),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn read(
		&mut self,
		_req: &Request,
		ino: u64,
		_fh: u64,
		offset: i64,
		size: u32,
		_flags: i32,
		_lock_owner: Option<u64>,
		reply: ReplyData,
	) {
		let Some(path) = self.path_of(ino).map(Path::to_path_buf) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		let mut buf = vec![0u8; size as usize];
		match self.fs.read(&path_str, &mut buf, offset as u64) {
			Ok(_) => reply.data(&buf),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn write(
		&mut self,
		_req: &Request,
		ino: u64,
		_fh: u64,
		offset: i64,
		data: &[u8],
		_write_flags: u32,
		_flags: i32,
		_lock_owner: Option<u64>,
		reply: ReplyWrite,
	) {
		let Some(path) = self.path_of(ino).map(Path::to_path_buf) else {
			reply.error(libc::EINVAL);
			return;
		};
		let path_str = path.to_string_lossy().into_owned();
		match self.fs.write(&path_str, data, offset as u64) {
			Ok(n) => reply.written(n as u32),
			Err(e) => reply.error(e.to_errno()),
		}
	}

	fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
		let st = self.fs.stat_fs();
		reply.statfs(
			st.total_blocks,
			st.free_blocks,
			st.free_blocks,
			st.total_inodes,
			st.free_inodes,
			st.block_size as u32,
			st.name_max,
			st.block_size as u32,
		);
	}

	fn destroy(&mut self) {}
}
