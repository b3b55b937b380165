use crate::{Error, Result};

/// A byte buffer owned by the caller of a control write.
///
/// Copying out of it may fail the way a copy from another address space can, which
/// surfaces as [`Error::Fault`].
pub trait UserBuffer {
	/// Declared length of the buffer.
	fn len(&self) -> usize;

	/// Copies the first `dst.len()` bytes into `dst`.
	fn copy_to(&self, dst: &mut [u8]) -> Result<()>;

	/// Returns true when the declared length is zero.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl UserBuffer for [u8] {
	fn len(&self) -> usize {
		<[u8]>::len(self)
	}

	fn copy_to(&self, dst: &mut [u8]) -> Result<()> {
		let src = self.get(..dst.len()).ok_or(Error::Fault)?;
		dst.copy_from_slice(src);
		Ok(())
	}
}

impl UserBuffer for str {
	fn len(&self) -> usize {
		str::len(self)
	}

	fn copy_to(&self, dst: &mut [u8]) -> Result<()> {
		self.as_bytes().copy_to(dst)
	}
}

impl UserBuffer for Vec<u8> {
	fn len(&self) -> usize {
		Vec::len(self)
	}

	fn copy_to(&self, dst: &mut [u8]) -> Result<()> {
		self.as_slice().copy_to(dst)
	}
}

impl UserBuffer for String {
	fn len(&self) -> usize {
		String::len(self)
	}

	fn copy_to(&self, dst: &mut [u8]) -> Result<()> {
		self.as_bytes().copy_to(dst)
	}
}
