//! The `a1fs` driver mounts an a1fs image as a host filesystem via FUSE.

mod adapter;

use std::env;
use std::path::PathBuf;
use std::process::exit;

use a1fs_core::image::Image;
use a1fs_core::FileSystem;
use fuser::MountOption;

const USAGE: &str = "Usage: a1fs image mountpoint [-h] [-o option,...]";

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	prog: String,
	help: bool,
	image_path: Option<PathBuf>,
	mountpoint: Option<PathBuf>,
	options: Vec<MountOption>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "a1fs".to_owned());

	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			"-o" => {
				let opts = iter.next().unwrap_or_else(|| {
					eprintln!("{}: -o requires an argument", args.prog);
					exit(1);
				});
				for opt in opts.split(',') {
					args.options.push(MountOption::CUSTOM(opt.to_owned()));
				}
			}
			_ if args.image_path.is_none() => args.image_path = Some(PathBuf::from(arg)),
			_ if args.mountpoint.is_none() => args.mountpoint = Some(PathBuf::from(arg)),
			_ => {
				eprintln!("{}: unexpected argument `{arg}`", args.prog);
				exit(1);
			}
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
	let mountpoint = args.mountpoint.unwrap_or_else(|| {
		eprintln!("{}: specify a mountpoint", args.prog);
		eprintln!("{USAGE}");
		exit(1);
	});

	let image = Image::open(&image_path).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(1);
	});
	let fs = FileSystem::new(image).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(1);
	});

	let mut options = vec![MountOption::FSName("a1fs".to_owned())];
	options.extend(args.options);

	if let Err(e) = fuser::mount2(adapter::Driver::new(fs), &mountpoint, &options) {
		eprintln!("{}: failed to mount {}: {}", args.prog, mountpoint.display(), e);
		exit(1);
	}
}
