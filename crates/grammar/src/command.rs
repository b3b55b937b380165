use binfmt_primitives::{Invalid, Result, UserBuffer};

/// A command written to the status control or to a per-rule control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// `0`
	Disable,
	/// `1`
	Enable,
	/// `-1`
	Remove,
}

/// Parses `0`, `1` or `-1`, each optionally followed by a newline.
///
/// An empty write parses to `None` and is treated as a no-op by the controls.
///
/// # Errors
///
/// [`binfmt_primitives::Error::InvalidArgument`] for anything else, including writes longer
/// than three bytes, and [`binfmt_primitives::Error::Fault`] when the copy fails.
pub fn parse_command<B: UserBuffer + ?Sized>(input: &B) -> Result<Option<Command>> {
	let count = input.len();
	if count > 3 {
		return Err(Invalid::Command.into());
	}
	let mut buf = [0u8; 3];
	input.copy_to(&mut buf[..count])?;

	let text = match &buf[..count] {
		[] => return Ok(None),
		[rest @ .., b'\n'] => rest,
		all => all,
	};
	match text {
		b"0" => Ok(Some(Command::Disable)),
		b"1" => Ok(Some(Command::Enable)),
		b"-1" => Ok(Some(Command::Remove)),
		_ => Err(Invalid::Command.into()),
	}
}
