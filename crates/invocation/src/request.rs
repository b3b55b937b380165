use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use binfmt_primitives::{ExecFile, PROBE_WINDOW, ProbeWindow, Result};

use crate::ArgList;

bitflags::bitflags! {
	/// Execution-time flags set while a request is rewritten.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ExecFlags: u8 {
		/// argv[0] was kept, so the interpreter finds the original argv[0] at argv[2].
		const PRESERVE_ARGV0 = 1 << 0;
		/// The interpreter receives an open descriptor for the original binary.
		const EXECFD = 1 << 1;
		/// Credentials are computed from that descriptor rather than the interpreter.
		const EXECFD_CREDS = 1 << 2;
	}
}

/// One exec attempt as seen by a candidate loader.
#[derive(Debug)]
pub struct ExecRequest {
	/// Path the caller asked to execute.
	pub filename: PathBuf,
	/// Program that will actually be executed; starts out equal to `filename`.
	pub interp: PathBuf,
	/// Leading bytes of `filename`.
	pub probe: ProbeWindow,
	pub argv: ArgList,
	/// Set when `filename` cannot be reopened by path, e.g. an fd-relative exec of an
	/// unlinked file.
	pub path_inaccessible: bool,
	pub flags: ExecFlags,
	/// Interpreter opened for execution once a loader has claimed the request.
	pub file: Option<Box<dyn ExecFile>>,
}

impl ExecRequest {
	pub fn new(filename: impl Into<PathBuf>, probe: ProbeWindow, argv: ArgList) -> Self {
		let filename = filename.into();
		Self {
			interp: filename.clone(),
			filename,
			probe,
			argv,
			path_inaccessible: false,
			flags: ExecFlags::empty(),
			file: None,
		}
	}

	/// Builds a request for `path`, reading its probe window from disk.
	pub fn open(path: &Path, argv: ArgList) -> Result<Self> {
		let mut prefix = Vec::with_capacity(PROBE_WINDOW);
		File::open(path)?
			.take(PROBE_WINDOW as u64)
			.read_to_end(&mut prefix)?;
		Ok(Self::new(path, ProbeWindow::from_prefix(&prefix), argv))
	}
}
