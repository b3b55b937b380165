use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use binfmt_primitives::{ExecFile, ProgramLoader};
use rustix::fs::{Access, access};
use tracing::trace;

/// Opens interpreters from the local filesystem.
///
/// Only regular files the caller may execute are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl ProgramLoader for FsLoader {
	fn open_exec(&self, path: &Path) -> io::Result<Box<dyn ExecFile>> {
		let file = File::open(path)?;
		if !file.metadata()?.is_file() {
			return Err(io::Error::new(
				io::ErrorKind::PermissionDenied,
				format!("{} is not a regular file", path.display()),
			));
		}
		access(path, Access::EXEC_OK)?;
		trace!(path = %path.display(), "opened interpreter");
		Ok(Box::new(Executable {
			path: path.to_owned(),
			file,
		}))
	}
}

/// An interpreter program opened by [`FsLoader`].
///
/// Userspace cannot take a deny-write lease on a file, so every handle reports itself
/// write-denied. The exec pipeline reads that as the request to hold writers off the image.
#[derive(Debug)]
pub struct Executable {
	path: PathBuf,
	file: File,
}

impl Executable {
	pub fn file(&self) -> &File {
		&self.file
	}
}

impl ExecFile for Executable {
	fn path(&self) -> &Path {
		&self.path
	}

	fn write_denied(&self) -> bool {
		true
	}

	fn clone_deny_write(&self) -> io::Result<Box<dyn ExecFile>> {
		Ok(Box::new(Executable {
			path: self.path.clone(),
			file: self.file.try_clone()?,
		}))
	}
}
