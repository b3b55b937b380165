use std::ffi::OsStr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::{ExecFile, OptionFlags, ProbeWindow};

/// Byte pattern matched at a fixed offset of the probe window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Magic {
	/// Offset of the first compared byte.
	pub offset: usize,
	/// Decoded pattern bytes.
	pub pattern: Vec<u8>,
	/// Decoded mask, same length as `pattern` when present.
	pub mask: Option<Vec<u8>>,
}

impl Magic {
	/// Compares the window bytes at `offset` against the pattern, through the mask if any.
	pub fn matches(&self, probe: &ProbeWindow) -> bool {
		let Some(window) = self
			.offset
			.checked_add(self.pattern.len())
			.and_then(|end| probe.as_bytes().get(self.offset..end))
		else {
			return false;
		};
		match &self.mask {
			Some(mask) => window
				.iter()
				.zip(&self.pattern)
				.zip(mask)
				.all(|((byte, pat), m)| (byte ^ pat) & m == 0),
			None => window == self.pattern.as_slice(),
		}
	}
}

/// How a rule recognizes a candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
	/// Exact byte match on the file name's suffix after its last `.`.
	Extension(String),
	/// Byte pattern at an offset of the probe window.
	Magic(Magic),
}

impl Matcher {
	/// Returns true when the candidate described by `probe` and `filename` matches.
	///
	/// `filename` is compared as raw bytes; it need not be UTF-8.
	pub fn matches(&self, probe: &ProbeWindow, filename: impl AsRef<OsStr>) -> bool {
		match self {
			Matcher::Extension(ext) => {
				let name = filename.as_ref().as_encoded_bytes();
				name.iter()
					.rposition(|&b| b == b'.')
					.is_some_and(|dot| &name[dot + 1..] == ext.as_bytes())
			}
			Matcher::Magic(magic) => magic.matches(probe),
		}
	}
}

/// A validated rule that has not been registered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
	/// Unique rule name; also the name of its control resource.
	pub name: String,
	/// Recognition criterion.
	pub matcher: Matcher,
	/// Program invoked in place of the matched file.
	pub interpreter: String,
	/// Options requested by the flag letters.
	pub flags: OptionFlags,
}

/// Identity of the control resource that exposes a registered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl std::fmt::Display for ResourceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A registered rule record.
///
/// Everything but the enabled bit and the preopened interpreter is immutable once built.
#[derive(Debug)]
pub struct Rule {
	def: RuleDef,
	enabled: AtomicBool,
	interpreter_file: Mutex<Option<Box<dyn ExecFile>>>,
	resource: ResourceId,
}

impl Rule {
	/// Builds an enabled record from a parsed definition.
	pub fn new(def: RuleDef, resource: ResourceId) -> Self {
		Self {
			def,
			enabled: AtomicBool::new(true),
			interpreter_file: Mutex::new(None),
			resource,
		}
	}

	/// Attaches the interpreter opened at registration time.
	pub fn with_interpreter_file(self, file: Box<dyn ExecFile>) -> Self {
		*self.interpreter_file.lock() = Some(file);
		self
	}

	pub fn def(&self) -> &RuleDef {
		&self.def
	}

	pub fn name(&self) -> &str {
		&self.def.name
	}

	pub fn matcher(&self) -> &Matcher {
		&self.def.matcher
	}

	pub fn interpreter(&self) -> &str {
		&self.def.interpreter
	}

	pub fn flags(&self) -> OptionFlags {
		self.def.flags
	}

	pub fn resource(&self) -> ResourceId {
		self.resource
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Acquire)
	}

	pub fn set_enabled(&self, enabled: bool) {
		self.enabled.store(enabled, Ordering::Release);
	}

	/// Returns true while a preopened interpreter is held.
	pub fn has_interpreter_file(&self) -> bool {
		self.interpreter_file.lock().is_some()
	}

	/// Runs `f` against the preopened interpreter, if any.
	pub fn with_preopened<R>(&self, f: impl FnOnce(&dyn ExecFile) -> R) -> Option<R> {
		self.interpreter_file.lock().as_deref().map(f)
	}

	/// Closes the preopened interpreter. Called once, when the last holder lets go.
	pub fn finalize(&self) {
		if let Some(file) = self.interpreter_file.lock().take() {
			debug!(rule = %self.def.name, path = ?file.path(), "closing preopened interpreter");
		}
	}
}
