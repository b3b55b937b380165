use std::io;

use rustix::io::Errno;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the parser, the registry and the control surfaces.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// Malformed registration grammar, malformed command or a size-window violation.
	#[error("invalid argument: {0}")]
	InvalidArgument(#[from] Invalid),
	/// A rule or control resource with this name is already present.
	#[error("{0:?} already exists")]
	AlreadyExists(String),
	/// The named resource, rule or backing path is gone.
	#[error("not found: {0}")]
	NotFound(String),
	/// Copying from the caller's buffer failed.
	#[error("bad address")]
	Fault,
	/// An allocation could not be satisfied; the caller may retry.
	#[error("out of memory")]
	OutOfMemory,
	/// Rewriting the argument list exceeded its byte budget.
	#[error("argument list too long")]
	ArgumentListTooLong,
	/// Opening or cloning an interpreter program failed.
	#[error("{0}")]
	Io(#[from] io::Error),
}

impl Error {
	/// Maps the error onto the errno a syscall-facing caller would report.
	pub fn errno(&self) -> Errno {
		match self {
			Error::InvalidArgument(_) => Errno::INVAL,
			Error::AlreadyExists(_) => Errno::EXIST,
			Error::NotFound(_) => Errno::NOENT,
			Error::Fault => Errno::FAULT,
			Error::OutOfMemory => Errno::NOMEM,
			Error::ArgumentListTooLong => Errno::TOOBIG,
			Error::Io(e) => Errno::from_io_error(e).unwrap_or(Errno::IO),
		}
	}
}

impl From<std::collections::TryReserveError> for Error {
	fn from(_: std::collections::TryReserveError) -> Self {
		Error::OutOfMemory
	}
}

/// Why an input was rejected with [`Error::InvalidArgument`].
///
/// Positions are byte offsets into the caller's buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Invalid {
	#[error("registration length {0} outside accepted bounds")]
	Length(usize),
	#[error("unterminated {field} field at position {position}")]
	Unterminated { field: &'static str, position: usize },
	#[error("bad rule name at position {position}")]
	Name { position: usize },
	#[error("unknown rule type at position {position}")]
	Type { position: usize },
	#[error("bad offset at position {position}")]
	Offset { position: usize },
	#[error("incomplete hex escape at position {position}")]
	Escape { position: usize },
	#[error("empty magic at position {position}")]
	EmptyMagic { position: usize },
	#[error("mask length {mask} does not match magic length {magic}")]
	MaskLength { magic: usize, mask: usize },
	#[error("magic of {len} bytes at offset {offset} exceeds the probe window")]
	Window { offset: usize, len: usize },
	#[error("bad extension at position {position}")]
	Extension { position: usize },
	#[error("empty interpreter at position {position}")]
	Interpreter { position: usize },
	#[error("trailing bytes at position {position}")]
	Trailing { position: usize },
	#[error("{field} is not valid UTF-8")]
	Encoding { field: &'static str },
	#[error("unrecognised command")]
	Command,
	#[error("operation not supported by {0}")]
	Unsupported(&'static str),
}
