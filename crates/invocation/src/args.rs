use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};

use binfmt_primitives::{Error, Result};

/// Argument list of an exec request, bounded by a byte budget.
///
/// Arguments are kept as raw OS strings. Each one is charged its byte length plus a
/// terminating NUL, the way the strings are laid out on the new program's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgList {
	args: VecDeque<OsString>,
	used: usize,
	budget: usize,
}

impl ArgList {
	/// Default byte budget.
	pub const DEFAULT_BUDGET: usize = 128 * 1024;

	/// Builds a list under [`Self::DEFAULT_BUDGET`].
	pub fn new<I, S>(args: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		Self::with_budget(args, Self::DEFAULT_BUDGET)
	}

	/// Builds a list under `budget`.
	///
	/// # Errors
	///
	/// [`Error::ArgumentListTooLong`] if `args` alone exceed the budget.
	pub fn with_budget<I, S>(args: I, budget: usize) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		let mut list = Self {
			args: VecDeque::new(),
			used: 0,
			budget,
		};
		for arg in args {
			let arg = arg.into();
			list.charge(&arg)?;
			list.args.push_back(arg);
		}
		Ok(list)
	}

	/// Inserts `arg` as the new first argument.
	///
	/// # Errors
	///
	/// [`Error::ArgumentListTooLong`] if the budget would be exceeded; the list is unchanged.
	pub fn push_front(&mut self, arg: impl Into<OsString>) -> Result<()> {
		let arg = arg.into();
		self.charge(&arg)?;
		self.args.push_front(arg);
		Ok(())
	}

	/// Removes and returns the first argument.
	pub fn pop_front(&mut self) -> Option<OsString> {
		let arg = self.args.pop_front()?;
		self.used -= arg.len() + 1;
		Some(arg)
	}

	pub fn len(&self) -> usize {
		self.args.len()
	}

	pub fn is_empty(&self) -> bool {
		self.args.is_empty()
	}

	/// Bytes charged so far.
	pub fn used(&self) -> usize {
		self.used
	}

	pub fn iter(&self) -> impl Iterator<Item = &OsStr> {
		self.args.iter().map(OsString::as_os_str)
	}

	pub fn to_vec(&self) -> Vec<OsString> {
		self.args.iter().cloned().collect()
	}

	fn charge(&mut self, arg: &OsStr) -> Result<()> {
		let used = self
			.used
			.checked_add(arg.len() + 1)
			.filter(|&used| used <= self.budget)
			.ok_or(Error::ArgumentListTooLong)?;
		self.used = used;
		Ok(())
	}
}
