use crate::PROBE_WINDOW;

/// The leading bytes of a candidate file, zero-padded to [`PROBE_WINDOW`].
#[derive(Clone, PartialEq, Eq)]
pub struct ProbeWindow {
	bytes: [u8; PROBE_WINDOW],
	filled: usize,
}

impl ProbeWindow {
	/// Builds a window from up to [`PROBE_WINDOW`] leading bytes; the rest is zero.
	pub fn from_prefix(prefix: &[u8]) -> Self {
		let filled = prefix.len().min(PROBE_WINDOW);
		let mut bytes = [0u8; PROBE_WINDOW];
		bytes[..filled].copy_from_slice(&prefix[..filled]);
		Self { bytes, filled }
	}

	/// Returns the whole window, padding included.
	pub fn as_bytes(&self) -> &[u8; PROBE_WINDOW] {
		&self.bytes
	}

	/// Number of bytes that came from the file.
	pub fn filled(&self) -> usize {
		self.filled
	}
}

impl Default for ProbeWindow {
	fn default() -> Self {
		Self::from_prefix(&[])
	}
}

impl std::fmt::Debug for ProbeWindow {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProbeWindow")
			.field("filled", &self.filled)
			.field("head", &&self.bytes[..self.filled.min(16)])
			.finish()
	}
}
