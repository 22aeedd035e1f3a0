//! The `mkfs-a1fs` tool initializes an empty a1fs filesystem inside an existing image file.

use std::env;
use std::path::PathBuf;
use std::process::exit;

use a1fs_core::image::Image;
use utils::disk::get_disk_size;
use utils::util::ByteSize;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,

	/// The requested inode count (`-i N`).
	inode_count: Option<u32>,
	/// Overwrite an already-formatted image (`-f`).
	force: bool,
	/// Zero the whole image before formatting (`-z`).
	zero: bool,
	/// Print command line help and exit.
	help: bool,

	/// Path to the image file to format.
	image_path: Option<PathBuf>,
}

const USAGE: &str = "Usage: mkfs-a1fs -i N [-f] [-z] [-h] image";

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "mkfs-a1fs".to_owned());

	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			"-f" => args.force = true,
			"-z" => args.zero = true,
			"-i" => {
				let n = iter.next().unwrap_or_else(|| {
					eprintln!("{}: -i requires an argument", args.prog);
					exit(1);
				});
				args.inode_count = Some(n.parse().unwrap_or_else(|_| {
					eprintln!("{}: -i: invalid inode count `{n}`", args.prog);
					exit(1);
				}));
			}
			_ => args.image_path = Some(PathBuf::from(arg)),
		}
	}

	args
}

fn main() {
	let args = parse_args();

	if args.help {
		println!("{USAGE}");
		exit(0);
	}

	let image_path = args.image_path.unwrap_or_else(|| {
		eprintln!("{}: specify path to an image file", args.prog);
		eprintln!("{USAGE}");
		exit(1);
	});

	let inode_count = match args.inode_count {
		Some(0) | None => {
			eprintln!("{}: -i N is required, with N > 0", args.prog);
			exit(1);
		}
		Some(n) => n,
	};

	let mut image = Image::open(&image_path).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(1);
	});

	a1fs_core::format::format(image.as_mut(), inode_count, args.force, args.zero).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(1);
	});

	let sectors = get_disk_size(&image_path).unwrap_or(0);
	println!(
		"{}: formatted {} with {inode_count} inodes",
		args.prog,
		ByteSize::from_sectors_count(sectors)
	);
}
