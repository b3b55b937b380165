bitflags::bitflags! {
	/// Options a registration may request through its trailing flag letters.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct OptionFlags: u8 {
		/// `P`: keep the original argv[0] instead of replacing it.
		const PRESERVE_ARGV0 = 1 << 0;
		/// `O`: hand the interpreter an open descriptor for the binary.
		const OPEN_BINARY = 1 << 1;
		/// `C`: compute credentials from the binary, not the interpreter.
		const CREDENTIALS = 1 << 2;
		/// `F`: open the interpreter once, at registration time.
		const OPEN_FILE = 1 << 3;
	}
}

impl OptionFlags {
	/// Maps a flag letter to the bits it sets. `C` implies `O`.
	pub fn from_letter(letter: u8) -> Option<Self> {
		match letter {
			b'P' => Some(Self::PRESERVE_ARGV0),
			b'O' => Some(Self::OPEN_BINARY),
			b'C' => Some(Self::CREDENTIALS | Self::OPEN_BINARY),
			b'F' => Some(Self::OPEN_FILE),
			_ => None,
		}
	}

	/// Renders the set flags as letters in `P`, `O`, `C`, `F` order.
	pub fn letters(self) -> String {
		[
			(Self::PRESERVE_ARGV0, 'P'),
			(Self::OPEN_BINARY, 'O'),
			(Self::CREDENTIALS, 'C'),
			(Self::OPEN_FILE, 'F'),
		]
		.into_iter()
		.filter(|(flag, _)| self.contains(*flag))
		.map(|(_, letter)| letter)
		.collect()
	}
}
