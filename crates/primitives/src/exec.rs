use std::fmt;
use std::io;
use std::path::Path;

/// An interpreter program opened for execution.
pub trait ExecFile: fmt::Debug + Send + Sync {
	/// Path the program was opened from.
	fn path(&self) -> &Path;

	/// Returns true once writers to the underlying file are denied.
	///
	/// A marker for the exec pipeline; loaders that cannot enforce it still report the
	/// intent.
	fn write_denied(&self) -> bool;

	/// Opens a second handle to the same file with write access denied.
	fn clone_deny_write(&self) -> io::Result<Box<dyn ExecFile>>;
}

/// Opens interpreter programs by path.
pub trait ProgramLoader: Send + Sync {
	/// Opens `path` as an executable.
	fn open_exec(&self, path: &Path) -> io::Result<Box<dyn ExecFile>>;
}
