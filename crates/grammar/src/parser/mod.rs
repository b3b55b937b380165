//! # Registration parser
//!
//! Turns a raw registration buffer into a validated [`RuleDef`].
//!
//! ## Supported Syntax
//!
//! ```text
//! rule      = D name D type D offset D magic D mask D interpreter D flags? "\n"?
//! type      = "E" | "M"
//! offset    = digits?                      (magic rules; empty means 0)
//! magic     = (byte | "\x" hex hex)+       (extension text for "E" rules)
//! mask      = (byte | "\x" hex hex)*       (ignored for "E" rules)
//! flags     = ("P" | "O" | "C" | "F")*
//! ```
//!
//! `D` is whatever byte the buffer starts with. The copied buffer is padded with `D` past
//! its declared length so a truncated final field reads as an empty one; any field that
//! ends inside the padding leaves the cursor past the end and is rejected as trailing data.

use binfmt_primitives::{
	Error, Invalid, MAX_REGISTER_LENGTH, MIN_REGISTER_LENGTH, Magic, Matcher, OptionFlags,
	PROBE_WINDOW, Result, RuleDef, UserBuffer,
};
use tracing::debug;

use crate::escape::{is_hex_digit, to_hex, unescape_hex};


/// Padding appended past the declared length.
const PAD: usize = 8;

/// Cursor over the padded registration buffer.
struct Parser<'a> {
	/// The padded buffer.
	buf: &'a [u8],
	/// Declared length, excluding padding.
	end: usize,
	/// Field delimiter.
	del: u8,
	/// Current byte position.
	position: usize,
}

impl<'a> Parser<'a> {
	fn new(buf: &'a [u8], end: usize) -> Self {
		Self {
			buf,
			end,
			del: buf[0],
			position: 1,
		}
	}

	/// Peeks at the next byte within the declared length.
	fn peek(&self) -> Option<u8> {
		if self.position < self.end {
			self.buf.get(self.position).copied()
		} else {
			None
		}
	}

	/// Consumes the next byte, padding included.
	fn next(&mut self) -> Option<u8> {
		let byte = self.buf.get(self.position).copied()?;
		self.position += 1;
		Some(byte)
	}

	/// Consumes the delimiter or fails with an unterminated `field`.
	fn take_del(&mut self, field: &'static str) -> Result<()> {
		let position = self.position;
		match self.next() {
			Some(byte) if byte == self.del => Ok(()),
			_ => Err(Invalid::Unterminated { field, position }.into()),
		}
	}

	/// Returns the bytes up to the next delimiter and steps past it.
	fn field(&mut self, field: &'static str) -> Result<(usize, &'a [u8])> {
		let start = self.position;
		let rest = self.buf.get(start..).unwrap_or_default();
		let len = rest
			.iter()
			.position(|&b| b == self.del)
			.ok_or(Invalid::Unterminated {
				field,
				position: start,
			})?;
		self.position = start + len + 1;
		Ok((start, &rest[..len]))
	}

	/// Like [`Parser::field`], but a `\x` escape must carry two hex digits and may not
	/// swallow the delimiter.
	fn escaped_field(&mut self, field: &'static str) -> Result<(usize, &'a [u8])> {
		let start = self.position;
		loop {
			let at = self.position;
			let byte = self.next().ok_or(Invalid::Unterminated {
				field,
				position: start,
			})?;
			if byte == self.del {
				return Ok((start, &self.buf[start..at]));
			}
			if byte == b'\\' && self.buf.get(self.position) == Some(&b'x') {
				self.position += 1;
				for _ in 0..2 {
					match self.next() {
						Some(digit) if is_hex_digit(digit) => {}
						_ => return Err(Invalid::Escape { position: at }.into()),
					}
				}
			}
		}
	}

	/// Consumes flag letters within the declared length.
	fn flags(&mut self) -> OptionFlags {
		let mut flags = OptionFlags::empty();
		while let Some(bits) = self.peek().and_then(OptionFlags::from_letter) {
			flags |= bits;
			self.position += 1;
		}
		flags
	}

	fn is_end(&self) -> bool {
		self.position == self.end
	}
}

/// Parses a registration buffer supplied by a caller.
///
/// # Errors
///
/// * [`Error::InvalidArgument`] with [`Invalid::Length`] when the declared length is
///   outside `MIN_REGISTER_LENGTH..=MAX_REGISTER_LENGTH`, checked before anything is
///   copied, or with a positional reason for malformed content.
/// * [`Error::OutOfMemory`] when the working copy cannot be allocated.
/// * [`Error::Fault`] when copying from the caller's buffer fails.
pub fn parse_rule<B: UserBuffer + ?Sized>(input: &B) -> Result<RuleDef> {
	let count = input.len();
	debug!(count, "register: received bytes");
	if !(MIN_REGISTER_LENGTH..=MAX_REGISTER_LENGTH).contains(&count) {
		return Err(Invalid::Length(count).into());
	}

	let mut buf = Vec::new();
	buf.try_reserve_exact(count + PAD)?;
	buf.resize(count, 0);
	input.copy_to(&mut buf)?;
	let del = buf[0];
	buf.resize(count + PAD, del);

	parse_padded(&buf, count)
}

/// Parses a registration held in a plain byte slice.
///
/// # Examples
///
/// ```
/// use binfmt_grammar::parse_rule_bytes;
/// use binfmt_primitives::Matcher;
///
/// let def = parse_rule_bytes(b":py:E::py::/usr/bin/python3:").unwrap();
/// assert_eq!(def.name, "py");
/// assert_eq!(def.matcher, Matcher::Extension("py".into()));
/// ```
pub fn parse_rule_bytes(bytes: &[u8]) -> Result<RuleDef> {
	parse_rule(bytes)
}

fn parse_padded(buf: &[u8], count: usize) -> Result<RuleDef> {
	let mut parser = Parser::new(buf, count);
	debug!(delimiter = ?char::from(parser.del), "register: delimiter");

	let (name_at, name) = parser.field("name")?;
	if name.is_empty() || name == b"." || name == b".." || name.contains(&b'/') {
		return Err(Invalid::Name { position: name_at }.into());
	}
	let name = utf8(name, "name")?;
	debug!(name = %name, "register: name");

	let type_at = parser.position;
	let magic_type = match parser.next() {
		Some(b'E') => false,
		Some(b'M') => true,
		_ => return Err(Invalid::Type { position: type_at }.into()),
	};
	parser.take_del("type")?;
	debug!(kind = if magic_type { "magic" } else { "extension" }, "register: type");

	let matcher = if magic_type {
		Matcher::Magic(parse_magic(&mut parser)?)
	} else {
		Matcher::Extension(parse_extension(&mut parser)?)
	};

	let (interp_at, interpreter) = parser.field("interpreter")?;
	if interpreter.is_empty() {
		return Err(Invalid::Interpreter {
			position: interp_at,
		}
		.into());
	}
	let interpreter = utf8(interpreter, "interpreter")?;
	debug!(interpreter = %interpreter, "register: interpreter");

	let flags = parser.flags();
	if parser.peek() == Some(b'\n') {
		parser.position += 1;
	}
	if !parser.is_end() {
		return Err(Invalid::Trailing {
			position: parser.position,
		}
		.into());
	}
	debug!(flags = %flags.letters(), "register: flags");

	Ok(RuleDef {
		name,
		matcher,
		interpreter,
		flags,
	})
}

/// Offset, magic and mask fields of an `M` rule.
fn parse_magic(parser: &mut Parser<'_>) -> Result<Magic> {
	let (offset_at, raw_offset) = parser.field("offset")?;
	let offset = if raw_offset.is_empty() {
		0
	} else {
		std::str::from_utf8(raw_offset)
			.ok()
			.and_then(|s| s.parse::<i32>().ok())
			.and_then(|v| usize::try_from(v).ok())
			.ok_or(Invalid::Offset {
				position: offset_at,
			})?
	};
	debug!(offset, "register: offset");

	let (magic_at, raw_magic) = parser.escaped_field("magic")?;
	if raw_magic.is_empty() {
		return Err(Invalid::EmptyMagic { position: magic_at }.into());
	}
	debug!(raw = %to_hex(raw_magic), "register: magic[raw]");

	let (_, raw_mask) = parser.escaped_field("mask")?;
	if raw_mask.is_empty() {
		debug!("register: mask[raw]: none");
	} else {
		debug!(raw = %to_hex(raw_mask), "register: mask[raw]");
	}

	let pattern = unescape_hex(raw_magic);
	let mask = if raw_mask.is_empty() {
		None
	} else {
		let mask = unescape_hex(raw_mask);
		if mask.len() != pattern.len() {
			return Err(Invalid::MaskLength {
				magic: pattern.len(),
				mask: mask.len(),
			}
			.into());
		}
		Some(mask)
	};

	if pattern.len() > PROBE_WINDOW || PROBE_WINDOW - pattern.len() < offset {
		return Err(Invalid::Window {
			offset,
			len: pattern.len(),
		}
		.into());
	}

	debug!(len = pattern.len(), decoded = %to_hex(&pattern), "register: magic[decoded]");
	if let Some(mask) = &mask {
		let masked: Vec<u8> = pattern.iter().zip(mask).map(|(p, m)| p & m).collect();
		debug!(decoded = %to_hex(mask), masked = %to_hex(&masked), "register: mask[decoded]");
	}

	Ok(Magic {
		offset,
		pattern,
		mask,
	})
}

/// Offset (skipped), extension and mask (skipped) fields of an `E` rule.
fn parse_extension(parser: &mut Parser<'_>) -> Result<String> {
	parser.field("offset")?;
	let (ext_at, ext) = parser.field("magic")?;
	if ext.is_empty() || ext.contains(&b'/') {
		return Err(Invalid::Extension { position: ext_at }.into());
	}
	let ext = utf8(ext, "extension")?;
	debug!(extension = %ext, "register: extension");
	parser.field("mask")?;
	Ok(ext)
}

fn utf8(bytes: &[u8], field: &'static str) -> Result<String> {
	String::from_utf8(bytes.to_vec()).map_err(|_| Error::from(Invalid::Encoding { field }))
}
