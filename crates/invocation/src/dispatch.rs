use std::path::{Path, PathBuf};
use std::sync::Arc;

use binfmt_primitives::{Error, OptionFlags, ProgramLoader, Result};
use binfmt_registry::Registry;
use tracing::{debug, trace};

use crate::{ExecFlags, ExecRequest};

/// What a candidate loader made of an exec request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// The request now runs the bound interpreter.
	Rewritten,
	/// Not this loader's concern; the pipeline should try the next one.
	NotRecognized,
}

/// Candidate loader backed by the rule registry.
pub struct MiscLoader {
	registry: Arc<Registry>,
	loader: Arc<dyn ProgramLoader>,
}

impl std::fmt::Debug for MiscLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MiscLoader")
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl MiscLoader {
	pub fn new(registry: Arc<Registry>, loader: Arc<dyn ProgramLoader>) -> Self {
		Self { registry, loader }
	}

	/// Looks `request` up and, on a hit, rewrites it to run the bound interpreter.
	///
	/// The rewritten argument list is `[interpreter, filename, argv[1..]]`, or
	/// `[interpreter, filename, argv[0], argv[1..]]` for rules with the `P` flag.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when the request's path cannot be reopened,
	/// [`Error::ArgumentListTooLong`] when the rewrite exceeds the argument budget, and the
	/// loader's error when the interpreter cannot be opened. The request may be partially
	/// rewritten on error; the exec attempt is expected to fail as a whole.
	pub fn load(&self, request: &mut ExecRequest) -> Result<Outcome> {
		if !self.registry.is_enabled() {
			trace!(filename = %request.filename.display(), "registry disabled");
			return Ok(Outcome::NotRecognized);
		}
		let filename = request.filename.clone().into_os_string();
		// Released on every return path when dropped.
		let Some(rule) = self.registry.lookup(&request.probe, &filename) else {
			trace!(filename = %request.filename.display(), "no rule matched");
			return Ok(Outcome::NotRecognized);
		};

		if request.path_inaccessible {
			return Err(Error::NotFound(request.filename.display().to_string()));
		}

		let flags = rule.flags();
		if flags.contains(OptionFlags::PRESERVE_ARGV0) {
			request.flags |= ExecFlags::PRESERVE_ARGV0;
		} else {
			request.argv.pop_front();
		}
		request.argv.push_front(filename)?;
		request.argv.push_front(rule.interpreter())?;
		request.interp = PathBuf::from(rule.interpreter());

		let file = match rule.with_preopened(|file| file.clone_deny_write()) {
			Some(cloned) => cloned?,
			None => self.loader.open_exec(Path::new(rule.interpreter()))?,
		};
		request.file = Some(file);

		if flags.contains(OptionFlags::OPEN_BINARY) {
			request.flags |= ExecFlags::EXECFD;
		}
		if flags.contains(OptionFlags::CREDENTIALS) {
			request.flags |= ExecFlags::EXECFD_CREDS;
		}

		debug!(
			rule = %rule.name(),
			filename = %request.filename.display(),
			interpreter = %rule.interpreter(),
			flags = ?request.flags,
			"exec rewritten"
		);
		Ok(Outcome::Rewritten)
	}
}
